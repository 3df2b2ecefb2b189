//! # Offset Storage
//!
//! Durable low-water mark for resumable mining.
//!
//! The advancer loads the record once at startup and saves it after every
//! cycle that completed without error. A crash between a completed cycle and
//! the save replays that cycle's window (at-least-once delivery).
//!
//! ## Record Format
//!
//! ```json
//! {
//!   "source_type": "oracle",
//!   "scn": "7745219",
//!   "committed_at": 1734000000,
//!   "metadata": {}
//! }
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! use rivven_logminer::common::{FileOffsetStore, OffsetRecord, OffsetStore};
//!
//! let store = FileOffsetStore::new("/var/rivven/offsets").await?;
//! store.save("ORCLPDB1", OffsetRecord::new(scn)).await?;
//!
//! if let Some(record) = store.load("ORCLPDB1").await? {
//!     advancer.resume_from(record.scn);
//! }
//! ```

use crate::common::{CdcError, Result};
use crate::logminer::Scn;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Persisted low-water mark.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OffsetRecord {
    /// Source type
    pub source_type: String,
    /// Next SCN to mine (everything below it has been delivered)
    pub scn: Scn,
    /// Unix timestamp (seconds) of the save
    pub committed_at: u64,
    /// Additional metadata
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl OffsetRecord {
    /// Create a record for an SCN.
    pub fn new(scn: Scn) -> Self {
        Self {
            source_type: "oracle".to_string(),
            scn,
            committed_at: current_timestamp(),
            metadata: HashMap::new(),
        }
    }

    /// Add metadata.
    pub fn with_metadata(mut self, key: &str, value: &str) -> Self {
        self.metadata.insert(key.to_string(), value.to_string());
        self
    }

    /// Age of the record in seconds.
    pub fn age_secs(&self) -> u64 {
        current_timestamp().saturating_sub(self.committed_at)
    }
}

fn current_timestamp() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Trait for offset storage backends.
#[async_trait]
pub trait OffsetStore: Send + Sync {
    /// Load the record for a key.
    async fn load(&self, key: &str) -> Result<Option<OffsetRecord>>;
    /// Durably save the record for a key.
    async fn save(&self, key: &str, record: OffsetRecord) -> Result<()>;
}

/// Shared offset store.
pub type SharedOffsetStore = Arc<dyn OffsetStore>;

/// File-backed offset store: one JSON file per key, replaced atomically.
pub struct FileOffsetStore {
    base_dir: PathBuf,
    fsync: bool,
}

impl FileOffsetStore {
    /// Create a store rooted at `base_dir`, creating the directory.
    pub async fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        Self::with_options(base_dir, true).await
    }

    /// Create a store with explicit fsync behaviour.
    pub async fn with_options(base_dir: impl AsRef<Path>, fsync: bool) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        fs::create_dir_all(&base_dir).await?;
        info!("Offset store at {}", base_dir.display());
        Ok(Self { base_dir, fsync })
    }

    fn file_path(&self, key: &str) -> PathBuf {
        self.base_dir.join(format!("{}.json", key))
    }

    fn validate_key(key: &str) -> Result<()> {
        if key.is_empty() || key.contains('/') || key.contains('\\') || key.contains("..") {
            return Err(CdcError::config(format!("Invalid offset key '{}'", key)));
        }
        Ok(())
    }
}

#[async_trait]
impl OffsetStore for FileOffsetStore {
    async fn load(&self, key: &str) -> Result<Option<OffsetRecord>> {
        Self::validate_key(key)?;
        let path = self.file_path(key);
        let contents = match fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let record: OffsetRecord = serde_json::from_str(&contents)
            .map_err(|e| CdcError::serialization(format!("{}: {}", path.display(), e)))?;
        debug!("Loaded offset for {}: {}", key, record.scn);
        Ok(Some(record))
    }

    async fn save(&self, key: &str, record: OffsetRecord) -> Result<()> {
        Self::validate_key(key)?;
        let path = self.file_path(key);
        let temp_path = path.with_extension("tmp");

        let json = serde_json::to_vec_pretty(&record)?;

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)
            .await?;
        file.write_all(&json).await?;
        if self.fsync {
            file.sync_all().await?;
        }
        drop(file);

        fs::rename(&temp_path, &path).await?;

        debug!("Saved offset for {}: {}", key, record.scn);
        Ok(())
    }
}

/// In-memory offset store (tests, or when persistence lives elsewhere).
#[derive(Debug, Default)]
pub struct MemoryOffsetStore {
    records: RwLock<HashMap<String, OffsetRecord>>,
    saves: std::sync::atomic::AtomicU64,
}

impl MemoryOffsetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> u64 {
        self.saves.load(std::sync::atomic::Ordering::Relaxed)
    }
}

#[async_trait]
impl OffsetStore for MemoryOffsetStore {
    async fn load(&self, key: &str) -> Result<Option<OffsetRecord>> {
        Ok(self.records.read().await.get(key).cloned())
    }

    async fn save(&self, key: &str, record: OffsetRecord) -> Result<()> {
        self.records.write().await.insert(key.to_string(), record);
        self.saves
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        Ok(())
    }
}
