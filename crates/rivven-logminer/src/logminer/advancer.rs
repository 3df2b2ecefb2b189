//! Offset advancer
//!
//! Drives one mining cycle at a time and owns the low-water mark `current`,
//! the next SCN to mine. Everything below `current` has been delivered.
//!
//! ```text
//!  clear ─▶ resolve(current) ─▶ register ─▶ start_pass ─▶ fetch ─▶ stop_pass
//!    ▲                                                                  │
//!    └──────── publish offset ◀── current = max(current, last + 1) ◀───┘
//! ```
//!
//! A failed cycle leaves `current` untouched and restarts from `clear`. A
//! capture gap is never retried.

use super::catalog::LogCatalog;
use super::config::LogMinerConfig;
use super::engine::{MinedRow, MiningEngine};
use super::metrics::LogMinerMetrics;
use super::resolver::WindowResolver;
use super::scn::Scn;
use super::segment::Window;
use super::session::MiningSession;
use crate::common::{CdcError, OffsetRecord, Result, RetryConfig, SharedOffsetStore};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, error, info, trace, warn};

/// Advisory hook for removing history the advancer no longer needs.
///
/// Called after a published cycle with a boundary at or below the low-water
/// mark. Failures are logged and never fail the cycle.
#[async_trait]
pub trait LogRetention: Send + Sync {
    async fn prune_below(&self, boundary: &Scn) -> Result<()>;
}

/// Result of one [`OffsetAdvancer::run_cycle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// A window was mined and the offset published
    Mined {
        segments: usize,
        rows: usize,
        current: Scn,
    },
    /// Nothing new to mine
    Idle { current: Scn },
    /// The row receiver was dropped
    Stopped,
}

/// Sequential mining loop over one database.
pub struct OffsetAdvancer<C, E> {
    resolver: WindowResolver<C>,
    session: MiningSession<E>,
    offsets: SharedOffsetStore,
    retention: Option<Arc<dyn LogRetention>>,
    config: LogMinerConfig,
    retry: RetryConfig,
    metrics: Arc<LogMinerMetrics>,
    current: Scn,
    initialized: bool,
}

impl<C: LogCatalog, E: MiningEngine> OffsetAdvancer<C, E> {
    pub fn new(
        catalog: Arc<C>,
        engine: E,
        offsets: SharedOffsetStore,
        config: LogMinerConfig,
    ) -> Self {
        let retry = config.retry_config();
        let metrics = LogMinerMetrics::new(config.database.clone());
        Self {
            resolver: WindowResolver::new(catalog).with_archive_dest(config.archive_dest_id),
            session: MiningSession::new(engine),
            offsets,
            retention: None,
            config,
            retry,
            metrics,
            current: Scn::UNKNOWN,
            initialized: false,
        }
    }

    pub fn with_retention(mut self, retention: Arc<dyn LogRetention>) -> Self {
        self.retention = Some(retention);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<LogMinerMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Low-water mark: the next SCN to mine.
    pub fn current(&self) -> Scn {
        self.current
    }

    /// Start from `scn` instead of the stored offset.
    pub fn resume_from(&mut self, scn: Scn) {
        self.current = scn;
        self.initialized = true;
        self.metrics.set_current_scn(scn);
    }

    pub fn session(&self) -> &MiningSession<E> {
        &self.session
    }

    pub fn metrics(&self) -> &Arc<LogMinerMetrics> {
        &self.metrics
    }

    /// Establish the starting position: stored offset, else the configured
    /// `start_scn`, else the database's current SCN.
    pub async fn initialize(&mut self) -> Result<Scn> {
        let key = self.config.database.as_str();
        let start = if let Some(record) = self.offsets.load(key).await? {
            info!("Resuming {} from stored SCN {}", key, record.scn);
            record.scn
        } else if let Some(scn) = self.config.parsed_start_scn()? {
            info!("Starting {} from configured SCN {}", key, scn);
            scn
        } else {
            let scn = self.resolver.catalog().current_scn().await?;
            if scn.is_unknown() {
                return Err(CdcError::source_unavailable(
                    "catalog reported no current SCN",
                ));
            }
            info!("Starting {} from current SCN {}", key, scn);
            scn
        };

        self.current = start;
        self.initialized = true;
        self.metrics.set_current_scn(start);
        Ok(start)
    }

    /// Run one cycle, forwarding rows to `tx` in order.
    ///
    /// On error the session is cleared and `current` is unchanged.
    pub async fn run_cycle(&mut self, tx: &mpsc::Sender<MinedRow>) -> Result<CycleOutcome> {
        if !self.initialized {
            self.initialize().await?;
        }

        match self.mine_once(tx).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                if let Err(clear_err) = self.session.clear().await {
                    warn!("Failed to clear session after cycle error: {}", clear_err);
                }
                if e.is_gap() {
                    self.metrics.record_gap();
                    error!(
                        "Capture gap for {} at SCN {}: {}",
                        self.config.database, self.current, e
                    );
                }
                Err(e)
            }
        }
    }

    async fn mine_once(&mut self, tx: &mpsc::Sender<MinedRow>) -> Result<CycleOutcome> {
        let started = Instant::now();
        let start = self.current;

        self.session.clear().await?;
        let window = self
            .resolver
            .resolve(&start, self.config.archive_log_margin())
            .await?;
        self.metrics
            .record_inconsistencies(window.inconsistencies.len());

        if window.is_empty() {
            self.current = self.current.max(window.covers_up_to);
            self.metrics.record_empty_window();
            trace!("No new redo past SCN {}", self.current);
            return Ok(CycleOutcome::Idle {
                current: self.current,
            });
        }

        let rows = self.read_window(&window).await?;
        let row_count = rows.len();
        let max_observed = rows.iter().map(|r| r.scn).max();

        for row in rows {
            if tx.send(row).await.is_err() {
                info!("Row receiver dropped, stopping at SCN {}", self.current);
                return Ok(CycleOutcome::Stopped);
            }
        }

        let advanced_to = match max_observed {
            Some(scn) => scn.next(),
            None => window.covers_up_to,
        };
        self.current = self.current.max(advanced_to);
        self.metrics.set_current_scn(self.current);

        self.publish().await?;
        self.prune().await;

        self.metrics
            .record_cycle(started.elapsed(), window.len(), row_count);
        debug!(
            "Mined [{}, {}) from {} segments: {} rows, current SCN {}",
            start,
            window.covers_up_to,
            window.len(),
            row_count,
            self.current
        );

        Ok(CycleOutcome::Mined {
            segments: window.len(),
            rows: row_count,
            current: self.current,
        })
    }

    async fn read_window(&mut self, window: &Window) -> Result<Vec<MinedRow>> {
        self.session.register(window).await?;
        self.session
            .start_pass(&window.start_scn, &window.covers_up_to)
            .await?;

        let read_timeout = self.config.read_timeout();
        let rows = match tokio::time::timeout(read_timeout, self.session.fetch_rows()).await {
            Ok(rows) => rows?,
            Err(_) => {
                return Err(CdcError::timeout(format!(
                    "read phase for [{}, {}) exceeded {:?}",
                    window.start_scn, window.covers_up_to, read_timeout
                )))
            }
        };

        self.session.stop_pass().await?;
        Ok(rows)
    }

    async fn publish(&mut self) -> Result<()> {
        let record = OffsetRecord::new(self.current)
            .with_metadata("database", &self.config.database);
        self.offsets.save(&self.config.database, record).await
    }

    async fn prune(&mut self) {
        let (Some(retention), Some(horizon)) = (&self.retention, self.config.retention_horizon)
        else {
            return;
        };
        let boundary = self.current.saturating_sub(u128::from(horizon));
        if boundary.is_unknown() {
            return;
        }
        debug_assert!(boundary <= self.current);
        if let Err(e) = retention.prune_below(&boundary).await {
            warn!("Retention pruning below SCN {} failed: {}", boundary, e);
        }
    }

    /// Run cycles until `active` is cleared, the receiver is dropped, or an
    /// error is not worth retrying.
    ///
    /// Returns the error of a capture gap or of exhausted retries.
    pub async fn run(&mut self, tx: mpsc::Sender<MinedRow>, active: Arc<AtomicBool>) -> Result<()> {
        let mut attempt: u32 = 0;
        let mut idle = self.config.poll_interval();

        while active.load(Ordering::Acquire) {
            match self.run_cycle(&tx).await {
                Ok(CycleOutcome::Mined { .. }) => {
                    attempt = 0;
                    idle = self.config.poll_interval();
                }
                Ok(CycleOutcome::Idle { .. }) => {
                    attempt = 0;
                    tokio::time::sleep(idle).await;
                    idle = idle.saturating_mul(2).min(self.config.max_poll_interval());
                }
                Ok(CycleOutcome::Stopped) => break,
                Err(e) if e.is_gap() => return Err(e),
                Err(e) => {
                    let retriable = e
                        .retriable_error_type()
                        .is_some_and(|t| self.retry.is_retriable(&t));
                    if !retriable || !self.retry.should_retry(attempt) {
                        error!(
                            "Mining {} failed after {} retries: {}",
                            self.config.database, attempt, e
                        );
                        return Err(e);
                    }

                    let delay = self.retry.delay_for_attempt(attempt);
                    attempt += 1;
                    self.metrics.record_retry(e.error_code());
                    warn!(
                        "Mining cycle failed (attempt {}), retrying in {:?}: {}",
                        attempt, delay, e
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }

        if let Err(e) = self.session.clear().await {
            warn!("Failed to clear session on shutdown: {}", e);
        }
        info!(
            "Mining loop for {} stopped at SCN {}",
            self.config.database, self.current
        );
        Ok(())
    }
}
