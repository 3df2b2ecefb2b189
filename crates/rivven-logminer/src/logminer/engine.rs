//! Mining engine contract and decoded rows
//!
//! The engine is the database-side log miner (`DBMS_LOGMNR`). It decodes redo
//! records itself; this crate only decides which files it reads and over
//! which SCN range.

use super::scn::Scn;
use crate::common::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Operation reported for a mined row (`V$LOGMNR_CONTENTS.OPERATION_CODE`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogMinerOp {
    Insert,
    Delete,
    Update,
    Ddl,
    Start,
    Commit,
    SelectLobLocator,
    LobWrite,
    Rollback,
    Unsupported,
}

impl LogMinerOp {
    /// Map an `OPERATION_CODE` value.
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => Self::Insert,
            2 => Self::Delete,
            3 => Self::Update,
            5 => Self::Ddl,
            6 => Self::Start,
            7 => Self::Commit,
            9 => Self::SelectLobLocator,
            10 => Self::LobWrite,
            36 => Self::Rollback,
            _ => Self::Unsupported,
        }
    }

    /// Row-level data change (as opposed to transaction control or DDL).
    pub fn is_dml(&self) -> bool {
        matches!(self, Self::Insert | Self::Update | Self::Delete)
    }
}

/// One decoded change row returned by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinedRow {
    /// SCN of the change
    pub scn: Scn,
    /// SCN of the owning transaction's commit, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_scn: Option<Scn>,
    /// Operation
    pub operation: LogMinerOp,
    /// Transaction id (`XID`, hex)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    /// Segment owner (schema)
    #[serde(default)]
    pub owner: String,
    /// Table name
    #[serde(default)]
    pub table: String,
    /// Reconstructed SQL (`SQL_REDO`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sql_redo: Option<String>,
    /// Change timestamp (Unix epoch seconds)
    pub timestamp: i64,
}

impl MinedRow {
    /// Minimal row for an SCN and operation.
    pub fn new(scn: Scn, operation: LogMinerOp) -> Self {
        Self {
            scn,
            commit_scn: None,
            operation,
            transaction_id: None,
            owner: String::new(),
            table: String::new(),
            sql_redo: None,
            timestamp: 0,
        }
    }

    pub fn with_table(mut self, owner: impl Into<String>, table: impl Into<String>) -> Self {
        self.owner = owner.into();
        self.table = table.into();
        self
    }

    pub fn with_transaction(mut self, xid: impl Into<String>, commit_scn: Option<Scn>) -> Self {
        self.transaction_id = Some(xid.into());
        self.commit_scn = commit_scn;
        self
    }

    pub fn with_sql_redo(mut self, sql: impl Into<String>) -> Self {
        self.sql_redo = Some(sql.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// Capability interface over the external mining engine.
///
/// Only [`MiningSession`](super::MiningSession) drives an engine; nothing
/// else should hold one.
#[async_trait]
pub trait MiningEngine: Send {
    /// Register one log file (`DBMS_LOGMNR.ADD_LOGFILE`).
    async fn add_segment(&mut self, name: &str) -> Result<()>;

    /// Unregister every log file.
    async fn remove_all_segments(&mut self) -> Result<()>;

    /// Begin a pass over `[start, end)` (`DBMS_LOGMNR.START_LOGMNR`).
    async fn start_mining(&mut self, start: &Scn, end: &Scn) -> Result<()>;

    /// Rows decoded by the active pass, in SCN order.
    async fn fetch_rows(&mut self) -> Result<Vec<MinedRow>>;

    /// End the active pass (`DBMS_LOGMNR.END_LOGMNR`).
    async fn end_mining(&mut self) -> Result<()>;

    /// Files the engine reports as registered (`V$LOGMNR_LOGS`).
    async fn registered_segments(&mut self) -> Result<Vec<String>>;
}
