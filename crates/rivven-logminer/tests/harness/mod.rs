#![allow(dead_code)]

//! Test harness for LogMiner integration tests
//!
//! Builds redo histories on the in-memory catalog and engine: a ring of
//! online log groups, their archived copies, and mined rows.

pub mod assertions;
pub mod data_generators;

pub use assertions::WindowAssertions;
pub use data_generators::{dml_rows, transaction_rows};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use rivven_logminer::common::{MemoryOffsetStore, Result};
use rivven_logminer::logminer::{
    LogMinerConfig, LogRetention, MemoryLogCatalog, MemoryMiningEngine, OffsetAdvancer, Scn,
    Segment,
};
use std::sync::{Arc, Once};

static INIT: Once = Once::new();

/// Initialize test logging (idempotent)
pub fn init_test_logging() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::from_default_env()
                    .add_directive("rivven_logminer=debug".parse().unwrap()),
            )
            .with_test_writer()
            .try_init()
            .ok();
    });
}

pub fn scn(v: u64) -> Scn {
    Scn::from(v)
}

/// Fixed wall clock the fixtures archive against.
pub fn archive_epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
}

pub fn online_name(group: u64) -> String {
    format!("/u01/oradata/ORCL/redo{:02}.log", group)
}

pub fn archive_name(sequence: u64) -> String {
    format!("/u01/arch/1_{}_1122334455.arc", sequence)
}

/// A database with `online_groups` redo groups and a known log switch history.
pub struct OracleFixture {
    pub catalog: Arc<MemoryLogCatalog>,
    pub engine: MemoryMiningEngine,
    pub offsets: Arc<MemoryOffsetStore>,
    online_groups: u64,
    /// `FIRST_CHANGE#` of every sequence, in order; the last one is CURRENT
    boundaries: Vec<u64>,
}

impl OracleFixture {
    /// History where sequence `i + 1` starts at `boundaries[i]`.
    ///
    /// Every sealed sequence is archived at [`archive_epoch`]; only the last
    /// `online_groups` sequences are still online. The clock is frozen one
    /// hour after the epoch and the current SCN sits at `current`.
    pub fn with_history(online_groups: u64, boundaries: &[u64], current: u64) -> Self {
        let fixture = Self {
            catalog: Arc::new(MemoryLogCatalog::new()),
            engine: MemoryMiningEngine::new(),
            offsets: Arc::new(MemoryOffsetStore::new()),
            online_groups,
            boundaries: boundaries.to_vec(),
        };
        fixture.rebuild_catalog(current);
        fixture
            .catalog
            .set_clock(archive_epoch() + chrono::Duration::hours(1));
        fixture
    }

    /// Five sequences starting at 100, 200, 300, 400, 500 over three groups.
    pub fn standard() -> Self {
        Self::with_history(3, &[100, 200, 300, 400, 500], 550)
    }

    /// Switch to a new sequence at `at`, archive the one just sealed, and
    /// move the current SCN to `current`.
    pub fn log_switch(&mut self, at: u64, current: u64) {
        self.boundaries.push(at);
        self.rebuild_catalog(current);
    }

    fn rebuild_catalog(&self, current: u64) {
        let total = self.boundaries.len() as u64;
        let first_online = total.saturating_sub(self.online_groups) + 1;

        let mut online = Vec::new();
        for (i, low) in self.boundaries.iter().enumerate() {
            let sequence = i as u64 + 1;
            let next = self.boundaries.get(i + 1).copied();

            if let Some(next) = next {
                let archived = Segment::archived(
                    archive_name(sequence),
                    scn(*low),
                    scn(next),
                    archive_epoch(),
                )
                .with_sequence(sequence);
                self.catalog.purge_archived(&archived.name);
                self.catalog.add_archived(archived);
            }

            if sequence >= first_online {
                let group = (sequence - 1) % self.online_groups + 1;
                let segment = match next {
                    Some(next) => Segment::online(online_name(group), scn(*low), scn(next), true),
                    None => Segment::online(online_name(group), scn(*low), Scn::UNKNOWN, false),
                };
                online.push(segment.with_sequence(sequence));
            }
        }

        self.catalog.set_online(online);
        self.catalog.set_current_scn(scn(current));
    }

    pub fn config(&self) -> LogMinerConfig {
        LogMinerConfig::builder()
            .database("ORCL")
            .start_scn("100")
            .poll_interval_ms(10)
            .max_poll_interval_ms(40)
            .retry_delay_ms(10)
            .max_retry_delay_ms(100)
            .retry_jitter(0.0)
            .build()
            .unwrap()
    }

    pub fn advancer(
        &self,
        config: LogMinerConfig,
    ) -> OffsetAdvancer<MemoryLogCatalog, MemoryMiningEngine> {
        OffsetAdvancer::new(
            self.catalog.clone(),
            self.engine.clone(),
            self.offsets.clone(),
            config,
        )
    }
}

/// Retention hook that records every boundary it is asked to prune below.
#[derive(Default)]
pub struct RecordingRetention {
    boundaries: Mutex<Vec<Scn>>,
}

impl RecordingRetention {
    pub fn boundaries(&self) -> Vec<Scn> {
        self.boundaries.lock().clone()
    }
}

#[async_trait]
impl LogRetention for RecordingRetention {
    async fn prune_below(&self, boundary: &Scn) -> Result<()> {
        self.boundaries.lock().push(*boundary);
        Ok(())
    }
}
