//! LogMiner source configuration

use super::scn::Scn;
use crate::common::{CdcConfig, CdcError, Result, RetryConfig};
use serde::{Deserialize, Serialize};
use std::time::Duration;

fn default_poll_interval_ms() -> u64 {
    1_000
}

fn default_max_poll_interval_ms() -> u64 {
    10_000
}

fn default_read_timeout_ms() -> u64 {
    30_000
}

fn default_buffer_size() -> usize {
    10_000
}

fn default_max_retries() -> i32 {
    10
}

fn default_retry_delay_ms() -> u64 {
    500
}

fn default_max_retry_delay_ms() -> u64 {
    30_000
}

fn default_retry_jitter() -> f64 {
    0.25
}

/// Oracle LogMiner source configuration
///
/// Deserializable from a connector config file; every field except
/// `database` has a default.
///
/// # Example
///
/// ```rust
/// use rivven_logminer::logminer::LogMinerConfig;
///
/// let config = LogMinerConfig::builder()
///     .database("ORCLPDB1")
///     .archive_log_margin_ms(30_000)
///     .read_timeout_ms(10_000)
///     .build()
///     .unwrap();
///
/// assert_eq!(config.archive_log_margin().as_secs(), 30);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogMinerConfig {
    /// Database name; also the offset store key
    pub database: String,
    /// SCN to start from when no offset is stored (empty = current SCN)
    #[serde(default)]
    pub start_scn: String,
    /// Delay before a freshly archived log is eligible (0 = none)
    #[serde(default)]
    pub archive_log_margin_ms: u64,
    /// Archive destination to read from (`V$ARCHIVED_LOG.DEST_ID`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive_dest_id: Option<u32>,
    /// Idle back-off after an empty window (default: 1000ms)
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Cap for the growing idle back-off (default: 10000ms)
    #[serde(default = "default_max_poll_interval_ms")]
    pub max_poll_interval_ms: u64,
    /// Bound on one read phase (default: 30000ms)
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
    /// Keep this many SCNs of history below the low-water mark before
    /// suggesting pruning (None = never prune)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retention_horizon: Option<u64>,
    /// Row channel capacity (default: 10000)
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
    /// Consecutive failed cycles before giving up (-1 = infinite)
    #[serde(default = "default_max_retries")]
    pub max_retries: i32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_max_retry_delay_ms")]
    pub max_retry_delay_ms: u64,
    #[serde(default = "default_retry_jitter")]
    pub retry_jitter: f64,
}

impl Default for LogMinerConfig {
    fn default() -> Self {
        Self {
            database: String::new(),
            start_scn: String::new(),
            archive_log_margin_ms: 0,
            archive_dest_id: None,
            poll_interval_ms: default_poll_interval_ms(),
            max_poll_interval_ms: default_max_poll_interval_ms(),
            read_timeout_ms: default_read_timeout_ms(),
            retention_horizon: None,
            buffer_size: default_buffer_size(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            max_retry_delay_ms: default_max_retry_delay_ms(),
            retry_jitter: default_retry_jitter(),
        }
    }
}

impl LogMinerConfig {
    pub fn builder() -> LogMinerConfigBuilder {
        LogMinerConfigBuilder::default()
    }

    /// Parsed `start_scn`, `None` when unset.
    pub fn parsed_start_scn(&self) -> Result<Option<Scn>> {
        if self.start_scn.trim().is_empty() {
            return Ok(None);
        }
        self.start_scn.parse().map(Some)
    }

    pub fn archive_log_margin(&self) -> Duration {
        Duration::from_millis(self.archive_log_margin_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn max_poll_interval(&self) -> Duration {
        Duration::from_millis(self.max_poll_interval_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// Back-off policy for failed cycles.
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::builder()
            .max_retries(self.max_retries)
            .retry_delay(Duration::from_millis(self.retry_delay_ms))
            .max_delay(Duration::from_millis(self.max_retry_delay_ms))
            .jitter(self.retry_jitter)
            .build()
    }
}

impl CdcConfig for LogMinerConfig {
    fn source_type(&self) -> &'static str {
        "oracle"
    }

    fn validate(&self) -> Result<()> {
        if self.database.trim().is_empty() {
            return Err(CdcError::config("Database is required"));
        }
        self.parsed_start_scn()
            .map_err(|e| CdcError::config(format!("Invalid start_scn: {}", e)))?;
        if self.poll_interval_ms == 0 {
            return Err(CdcError::config("Poll interval must be > 0"));
        }
        if self.max_poll_interval_ms < self.poll_interval_ms {
            return Err(CdcError::config(
                "Max poll interval must be >= poll interval",
            ));
        }
        if self.read_timeout_ms == 0 {
            return Err(CdcError::config("Read timeout must be > 0"));
        }
        if self.buffer_size == 0 {
            return Err(CdcError::config("Buffer size must be > 0"));
        }
        if self.max_retries < -1 {
            return Err(CdcError::config(
                "Max retries must be -1 (infinite), 0 (disabled) or positive",
            ));
        }
        if self.max_retry_delay_ms < self.retry_delay_ms {
            return Err(CdcError::config(
                "Max retry delay must be >= retry delay",
            ));
        }
        if !(0.0..=1.0).contains(&self.retry_jitter) {
            return Err(CdcError::config("Retry jitter must be within 0.0..=1.0"));
        }
        if self.retention_horizon == Some(0) {
            return Err(CdcError::config(
                "Retention horizon must be > 0 when set",
            ));
        }
        Ok(())
    }
}

/// Builder for LogMinerConfig
#[derive(Default)]
pub struct LogMinerConfigBuilder {
    config: LogMinerConfig,
}

impl LogMinerConfigBuilder {
    /// Set the database name (also the offset key)
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.config.database = database.into();
        self
    }

    /// Set the SCN to start from when no offset is stored
    pub fn start_scn(mut self, scn: impl Into<String>) -> Self {
        self.config.start_scn = scn.into();
        self
    }

    /// Set the archival safety margin in milliseconds
    pub fn archive_log_margin_ms(mut self, ms: u64) -> Self {
        self.config.archive_log_margin_ms = ms;
        self
    }

    pub fn archive_dest_id(mut self, dest_id: u32) -> Self {
        self.config.archive_dest_id = Some(dest_id);
        self
    }

    /// Set the idle back-off in milliseconds (default: 1000ms)
    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.poll_interval_ms = ms;
        self
    }

    pub fn max_poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.max_poll_interval_ms = ms;
        self
    }

    /// Set the read phase timeout in milliseconds (default: 30000ms)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Enable retention pruning, keeping `horizon` SCNs below the mark
    pub fn retention_horizon(mut self, horizon: u64) -> Self {
        self.config.retention_horizon = Some(horizon);
        self
    }

    /// Set the row channel capacity (default: 10000)
    pub fn buffer_size(mut self, size: usize) -> Self {
        self.config.buffer_size = size;
        self
    }

    /// Set maximum consecutive failed cycles (-1 = infinite)
    pub fn max_retries(mut self, retries: i32) -> Self {
        self.config.max_retries = retries;
        self
    }

    pub fn retry_delay_ms(mut self, ms: u64) -> Self {
        self.config.retry_delay_ms = ms;
        self
    }

    pub fn max_retry_delay_ms(mut self, ms: u64) -> Self {
        self.config.max_retry_delay_ms = ms;
        self
    }

    pub fn retry_jitter(mut self, jitter: f64) -> Self {
        self.config.retry_jitter = jitter;
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<LogMinerConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
