//! # Oracle LogMiner Source
//!
//! Redo log window resolution and mining session management for Oracle
//! LogMiner.
//!
//! ## Architecture
//!
//! LogMiner only decodes the redo log files explicitly registered with the
//! session. Every cycle therefore decides which files cover the range from
//! the last delivered SCN up to now, across two inventories that overlap:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     LogMiner Capture Cycle                      │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  ┌──────────────┐   ┌──────────────┐                            │
//! │  │ V$LOG        │   │V$ARCHIVED_LOG│   LogCatalog               │
//! │  │ (online)     │   │ (archived)   │                            │
//! │  └──────┬───────┘   └──────┬───────┘                            │
//! │         └────────┬─────────┘                                    │
//! │                  ▼                                              │
//! │         ┌─────────────────┐   merge by NEXT_CHANGE#,            │
//! │         │ WindowResolver  │   online wins, gap check            │
//! │         └────────┬────────┘                                     │
//! │                  ▼                                              │
//! │         ┌─────────────────┐   clear / ADD_LOGFILE /             │
//! │         │ MiningSession   │   START_LOGMNR / END_LOGMNR         │
//! │         └────────┬────────┘                                     │
//! │                  ▼                                              │
//! │         ┌─────────────────┐   low-water mark, offset store,     │
//! │         │ OffsetAdvancer  │   retries, retention                │
//! │         └─────────────────┘                                     │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Position Model
//!
//! | Term | Meaning |
//! |------|---------|
//! | SCN | System change number, totally ordered |
//! | `FIRST_CHANGE#` | Inclusive lower bound of a log file |
//! | `NEXT_CHANGE#` | Exclusive upper bound; dedup key between inventories |
//! | low-water mark | Next SCN to mine; persisted after each clean cycle |
//!
//! A hole in the resolved window is reported as [`CdcError::WindowGap`]
//! and stops the source: skipping it would silently lose committed changes.
//!
//! [`CdcError::WindowGap`]: crate::common::CdcError::WindowGap

mod advancer;
mod catalog;
mod config;
mod engine;
pub mod error;
mod memory;
mod metrics;
mod resolver;
mod scn;
mod segment;
mod session;
pub mod sql;
mod source;

pub use advancer::{CycleOutcome, LogRetention, OffsetAdvancer};
pub use catalog::{archived_segment_visible, LogCatalog};
pub use config::{LogMinerConfig, LogMinerConfigBuilder};
pub use engine::{LogMinerOp, MinedRow, MiningEngine};
pub use error::OracleError;
pub use memory::{EngineCall, MemoryLogCatalog, MemoryMiningEngine};
pub use metrics::{LogMinerMetrics, LogMinerMetricsSnapshot};
pub use resolver::{build_window, merge_segments, WindowResolver};
pub use scn::Scn;
pub use segment::{CatalogInconsistency, Segment, SegmentOrigin, Window};
pub use session::{MiningSession, SessionState};
pub use source::LogMinerCdc;
