//! LogMiner source metrics
//!
//! Atomic counters for [`LogMinerCdc::metrics`](super::LogMinerCdc::metrics)
//! snapshots, mirrored to the `metrics` facade as `rivven_logminer_*` with a
//! `database` label.

use super::scn::Scn;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// LogMiner metrics
///
/// Thread-safe metrics collection for observability.
#[derive(Default)]
pub struct LogMinerMetrics {
    database: String,
    /// Completed mining cycles
    cycles: AtomicU64,
    /// Cycles that found nothing to mine
    empty_windows: AtomicU64,
    /// Files registered across all cycles
    segments_registered: AtomicU64,
    /// Rows forwarded downstream
    rows_mined: AtomicU64,
    /// Failed cycles that were retried
    retries: AtomicU64,
    /// Tie-break warnings raised by window resolution
    inconsistencies: AtomicU64,
    /// Capture gaps detected
    gaps: AtomicU64,
    /// Low-water mark, truncated to 64 bits
    current_scn: AtomicU64,
    /// Duration of the last cycle in milliseconds
    last_cycle_ms: AtomicU64,
}

impl LogMinerMetrics {
    pub fn new(database: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            database: database.into(),
            ..Default::default()
        })
    }

    pub(crate) fn record_cycle(&self, duration: Duration, segments: usize, rows: usize) {
        let ms = duration.as_millis() as u64;
        self.cycles.fetch_add(1, Ordering::Relaxed);
        self.last_cycle_ms.store(ms, Ordering::Relaxed);
        self.segments_registered
            .fetch_add(segments as u64, Ordering::Relaxed);
        self.rows_mined.fetch_add(rows as u64, Ordering::Relaxed);

        let db = self.database.clone();
        metrics::counter!("rivven_logminer_cycles_total", "database" => db.clone()).increment(1);
        metrics::counter!("rivven_logminer_segments_registered_total", "database" => db.clone())
            .increment(segments as u64);
        metrics::counter!("rivven_logminer_rows_mined_total", "database" => db.clone())
            .increment(rows as u64);
        metrics::histogram!("rivven_logminer_cycle_duration_seconds", "database" => db)
            .record(duration.as_secs_f64());
    }

    pub(crate) fn record_empty_window(&self) {
        self.empty_windows.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("rivven_logminer_empty_windows_total", "database" => self.database.clone())
            .increment(1);
    }

    pub(crate) fn record_retry(&self, error_code: &'static str) {
        self.retries.fetch_add(1, Ordering::Relaxed);
        metrics::counter!(
            "rivven_logminer_retries_total",
            "database" => self.database.clone(),
            "error" => error_code
        )
        .increment(1);
    }

    pub(crate) fn record_inconsistencies(&self, count: usize) {
        if count == 0 {
            return;
        }
        self.inconsistencies
            .fetch_add(count as u64, Ordering::Relaxed);
        metrics::counter!("rivven_logminer_catalog_inconsistencies_total", "database" => self.database.clone())
            .increment(count as u64);
    }

    pub(crate) fn record_gap(&self) {
        self.gaps.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("rivven_logminer_capture_gaps_total", "database" => self.database.clone())
            .increment(1);
    }

    pub(crate) fn set_current_scn(&self, scn: Scn) {
        let truncated = u64::try_from(scn.value()).unwrap_or(u64::MAX);
        self.current_scn.store(truncated, Ordering::Relaxed);
        metrics::gauge!("rivven_logminer_current_scn", "database" => self.database.clone())
            .set(truncated as f64);
    }

    /// Export metrics snapshot
    pub fn snapshot(&self) -> LogMinerMetricsSnapshot {
        LogMinerMetricsSnapshot {
            cycles: self.cycles.load(Ordering::Relaxed),
            empty_windows: self.empty_windows.load(Ordering::Relaxed),
            segments_registered: self.segments_registered.load(Ordering::Relaxed),
            rows_mined: self.rows_mined.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            inconsistencies: self.inconsistencies.load(Ordering::Relaxed),
            gaps: self.gaps.load(Ordering::Relaxed),
            current_scn: self.current_scn.load(Ordering::Relaxed),
            last_cycle_ms: self.last_cycle_ms.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot for external export
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogMinerMetricsSnapshot {
    pub cycles: u64,
    pub empty_windows: u64,
    pub segments_registered: u64,
    pub rows_mined: u64,
    pub retries: u64,
    pub inconsistencies: u64,
    pub gaps: u64,
    pub current_scn: u64,
    pub last_cycle_ms: u64,
}
