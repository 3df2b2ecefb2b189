//! Oracle LogMiner CDC source
//!
//! Runs an [`OffsetAdvancer`] on a background task and exposes the mined rows
//! through a bounded channel.

use super::advancer::{LogRetention, OffsetAdvancer};
use super::catalog::LogCatalog;
use super::config::LogMinerConfig;
use super::engine::{MinedRow, MiningEngine};
use super::metrics::{LogMinerMetrics, LogMinerMetricsSnapshot};
use crate::common::{CdcConfig, CdcError, CdcSource, Result, SharedOffsetStore};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// LogMiner CDC source for one database.
///
/// # Example
///
/// ```rust,ignore
/// use rivven_logminer::common::{CdcSource, FileOffsetStore};
/// use rivven_logminer::logminer::{LogMinerCdc, LogMinerConfig};
///
/// let config = LogMinerConfig::builder()
///     .database("ORCLPDB1")
///     .archive_log_margin_ms(30_000)
///     .build()?;
/// let offsets = Arc::new(FileOffsetStore::new("/var/rivven/offsets").await?);
///
/// let mut cdc = LogMinerCdc::new(config, catalog, engine, offsets)?;
/// let mut rows = cdc.take_event_receiver().unwrap();
/// cdc.start().await?;
///
/// while let Some(row) = rows.recv().await {
///     println!("{} {:?} {}.{}", row.scn, row.operation, row.owner, row.table);
/// }
/// ```
pub struct LogMinerCdc<C, E> {
    config: LogMinerConfig,
    active: Arc<AtomicBool>,
    advancer: Mutex<Option<OffsetAdvancer<C, E>>>,
    event_tx: Option<mpsc::Sender<MinedRow>>,
    event_rx: Option<mpsc::Receiver<MinedRow>>,
    task: Option<JoinHandle<Result<()>>>,
    metrics: Arc<LogMinerMetrics>,
}

impl<C, E> LogMinerCdc<C, E>
where
    C: LogCatalog + 'static,
    E: MiningEngine + 'static,
{
    /// Create a source. Fails if `config` does not validate.
    pub fn new(
        config: LogMinerConfig,
        catalog: Arc<C>,
        engine: E,
        offsets: SharedOffsetStore,
    ) -> Result<Self> {
        config.validate()?;

        let metrics = LogMinerMetrics::new(config.database.clone());
        let advancer = OffsetAdvancer::new(catalog, engine, offsets, config.clone())
            .with_metrics(metrics.clone());
        let (tx, rx) = mpsc::channel(config.buffer_size);

        Ok(Self {
            config,
            active: Arc::new(AtomicBool::new(false)),
            advancer: Mutex::new(Some(advancer)),
            event_tx: Some(tx),
            event_rx: Some(rx),
            task: None,
            metrics,
        })
    }

    /// Attach a retention hook. Must be called before [`start`](CdcSource::start).
    pub fn with_retention(self, retention: Arc<dyn LogRetention>) -> Self {
        {
            let mut slot = self.advancer.lock();
            if let Some(advancer) = slot.take() {
                *slot = Some(advancer.with_retention(retention));
            }
        }
        self
    }

    /// Take the row receiver (can only be called once)
    pub fn take_event_receiver(&mut self) -> Option<mpsc::Receiver<MinedRow>> {
        self.event_rx.take()
    }

    pub fn config(&self) -> &LogMinerConfig {
        &self.config
    }

    /// Get current metrics snapshot
    pub fn metrics(&self) -> LogMinerMetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Wait for the mining task to finish and return its result.
    ///
    /// A capture gap surfaces here as [`CdcError::WindowGap`].
    pub async fn wait(&mut self) -> Result<()> {
        let Some(task) = self.task.take() else {
            return Ok(());
        };
        task.await
            .map_err(|e| CdcError::other(format!("Mining task failed: {}", e)))?
    }
}

#[async_trait]
impl<C, E> CdcSource for LogMinerCdc<C, E>
where
    C: LogCatalog + 'static,
    E: MiningEngine + 'static,
{
    async fn start(&mut self) -> Result<()> {
        info!("Starting Oracle LogMiner CDC for {}", self.config.database);

        if self.active.load(Ordering::SeqCst) {
            return Err(CdcError::config("CDC source already started"));
        }
        let mut advancer = self
            .advancer
            .lock()
            .take()
            .ok_or_else(|| CdcError::invalid_state("CDC source cannot be restarted"))?;
        let event_tx = self
            .event_tx
            .take()
            .ok_or_else(|| CdcError::config("Event sender not available"))?;

        self.active.store(true, Ordering::SeqCst);
        let active = self.active.clone();

        self.task = Some(tokio::spawn(async move {
            let result = advancer.run(event_tx, active.clone()).await;
            active.store(false, Ordering::SeqCst);
            if let Err(e) = &result {
                error!("LogMiner loop error: {}", e);
            }
            result
        }));

        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        info!("Stopping Oracle LogMiner CDC for {}", self.config.database);
        self.active.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn is_healthy(&self) -> bool {
        self.active.load(Ordering::SeqCst)
            && self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::MemoryOffsetStore;
    use crate::logminer::memory::{MemoryLogCatalog, MemoryMiningEngine};

    fn source() -> LogMinerCdc<MemoryLogCatalog, MemoryMiningEngine> {
        let config = LogMinerConfig::builder().database("ORCL").build().unwrap();
        LogMinerCdc::new(
            config,
            Arc::new(MemoryLogCatalog::new()),
            MemoryMiningEngine::new(),
            Arc::new(MemoryOffsetStore::new()),
        )
        .unwrap()
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = LogMinerCdc::new(
            LogMinerConfig::default(),
            Arc::new(MemoryLogCatalog::new()),
            MemoryMiningEngine::new(),
            Arc::new(MemoryOffsetStore::new()),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_receiver_taken_once() {
        let mut cdc = source();
        assert!(cdc.take_event_receiver().is_some());
        assert!(cdc.take_event_receiver().is_none());
    }

    #[tokio::test]
    async fn test_not_healthy_before_start() {
        let cdc = source();
        assert!(!cdc.is_healthy().await);
        assert_eq!(cdc.metrics().cycles, 0);
    }
}
