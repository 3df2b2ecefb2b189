//! # rivven-logminer - Oracle LogMiner capture for Rivven
//!
//! Decides which redo log files an Oracle LogMiner session must read so that
//! every committed change is captured exactly once in order, and advances a
//! durable low-water mark as the files are mined.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐   ┌───────────┐
//! │  Online   │   │ Archived  │
//! │ redo logs │   │ redo logs │
//! └─────┬─────┘   └─────┬─────┘
//!       │               │
//!       ▼               ▼
//! ┌──────────────────────────────────────────────────────────┐
//! │              LogCatalog → WindowResolver                 │
//! │   gap-free, duplicate-free window of log files           │
//! └──────────────────────────────────────────────────────────┘
//!       │
//!       ▼
//! ┌──────────────────────────────────────────────────────────┐
//! │        MiningSession → OffsetAdvancer → LogMinerCdc      │
//! │   register, mine, advance SCN, publish offset            │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! # async fn example() -> anyhow::Result<()> {
//! use rivven_logminer::logminer::{
//!     LogMinerCdc, LogMinerConfig, MemoryLogCatalog, MemoryMiningEngine,
//! };
//! use rivven_logminer::common::MemoryOffsetStore;
//! use rivven_logminer::CdcSource;
//! use std::sync::Arc;
//!
//! let config = LogMinerConfig::builder()
//!     .database("ORCLPDB1")
//!     .archive_log_margin_ms(30_000)
//!     .build()?;
//!
//! let mut cdc = LogMinerCdc::new(
//!     config,
//!     Arc::new(MemoryLogCatalog::new()),
//!     MemoryMiningEngine::new(),
//!     Arc::new(MemoryOffsetStore::new()),
//! )?;
//! let mut rows = cdc.take_event_receiver().expect("receiver");
//! cdc.start().await?;
//!
//! while let Some(row) = rows.recv().await {
//!     println!("{} {:?}", row.scn, row.operation);
//! }
//! # Ok(())
//! # }
//! ```

pub mod common;
pub mod logminer;

pub use common::{CdcConfig, CdcError, CdcSource, ErrorCategory, Result};
pub use logminer::{LogMinerCdc, LogMinerConfig, MinedRow, Scn, Window, WindowResolver};
