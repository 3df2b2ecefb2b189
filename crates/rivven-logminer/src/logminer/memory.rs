//! In-memory catalog and mining engine
//!
//! Deterministic stand-ins for the Oracle views and `DBMS_LOGMNR`, used by the
//! test suites and by embedders that want to exercise the advancer without a
//! database. Locks are `parking_lot` and never held across an `.await`.

use super::catalog::{archived_segment_visible, LogCatalog};
use super::engine::{MinedRow, MiningEngine};
use super::error::OracleError;
use super::scn::Scn;
use super::segment::Segment;
use crate::common::{CdcError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Default)]
struct CatalogState {
    online: Vec<Segment>,
    archived: Vec<Segment>,
    current_scn: Scn,
    clock: Option<DateTime<Utc>>,
    unavailable: Option<String>,
}

/// [`LogCatalog`] backed by plain vectors.
///
/// The clock used for the archival margin is the wall clock unless frozen
/// with [`set_clock`](Self::set_clock).
#[derive(Debug, Default)]
pub struct MemoryLogCatalog {
    state: RwLock<CatalogState>,
}

impl MemoryLogCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_current_scn(&self, scn: Scn) {
        self.state.write().current_scn = scn;
    }

    pub fn add_online(&self, segment: Segment) {
        self.state.write().online.push(segment);
    }

    pub fn add_archived(&self, segment: Segment) {
        self.state.write().archived.push(segment);
    }

    /// Replace the whole online inventory.
    pub fn set_online(&self, segments: Vec<Segment>) {
        self.state.write().online = segments;
    }

    /// Seal the open online log at `at` and open `next_name` from there.
    pub fn switch_log(&self, next_name: impl Into<String>, at: Scn) {
        let mut state = self.state.write();
        for segment in state.online.iter_mut().filter(|s| s.is_open()) {
            segment.next_scn = at;
            segment.sealed = true;
        }
        state
            .online
            .push(Segment::online(next_name, at, Scn::UNKNOWN, false));
    }

    /// Copy a sealed online log into the archive, completed at `completed_at`.
    pub fn archive(
        &self,
        online_name: &str,
        archive_name: impl Into<String>,
        completed_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut state = self.state.write();
        let source = state
            .online
            .iter()
            .find(|s| s.name == online_name)
            .cloned()
            .ok_or_else(|| CdcError::other(format!("no online log named {online_name}")))?;
        if source.is_open() {
            return Err(CdcError::invalid_state(format!(
                "{online_name} is still being written"
            )));
        }
        let mut archived =
            Segment::archived(archive_name, source.low_scn, source.next_scn, completed_at);
        archived.sequence = source.sequence;
        state.archived.push(archived);
        Ok(())
    }

    /// Drop an online log, as when its group is reused.
    pub fn remove_online(&self, name: &str) {
        self.state.write().online.retain(|s| s.name != name);
    }

    /// Drop an archived log, as when RMAN deletes it.
    pub fn purge_archived(&self, name: &str) {
        self.state.write().archived.retain(|s| s.name != name);
    }

    /// Freeze the clock used for the archival margin.
    pub fn set_clock(&self, now: DateTime<Utc>) {
        self.state.write().clock = Some(now);
    }

    /// Make every query fail with `reason`, or recover with `None`.
    pub fn set_unavailable(&self, reason: Option<&str>) {
        self.state.write().unavailable = reason.map(str::to_string);
    }

    fn check_available(state: &CatalogState) -> Result<()> {
        match &state.unavailable {
            Some(reason) => Err(CdcError::source_unavailable(reason.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl LogCatalog for MemoryLogCatalog {
    async fn online_segments(&self, as_of: &Scn) -> Result<Vec<Segment>> {
        let state = self.state.read();
        Self::check_available(&state)?;

        let mut segments: Vec<Segment> = state
            .online
            .iter()
            .filter(|s| s.reaches_past(as_of))
            .cloned()
            .collect();
        segments.sort_by_key(|s| s.low_scn);
        Ok(segments)
    }

    async fn archived_segments(
        &self,
        after: &Scn,
        margin: Duration,
        dest_id: Option<u32>,
    ) -> Result<Vec<Segment>> {
        let state = self.state.read();
        Self::check_available(&state)?;

        let now = state.clock.unwrap_or_else(Utc::now);
        let mut segments: Vec<Segment> = state
            .archived
            .iter()
            .filter(|s| archived_segment_visible(s, after, margin, now))
            .filter(|s| dest_id.map_or(true, |dest| s.dest_id == Some(dest)))
            .cloned()
            .collect();
        segments.sort_by_key(|s| s.low_scn);
        Ok(segments)
    }

    async fn current_scn(&self) -> Result<Scn> {
        let state = self.state.read();
        Self::check_available(&state)?;
        Ok(state.current_scn)
    }
}

/// A call received by [`MemoryMiningEngine`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    AddSegment(String),
    RemoveAll,
    StartMining { start: Scn, end: Scn },
    FetchRows,
    EndMining,
}

#[derive(Debug, Default)]
struct EngineState {
    calls: Vec<EngineCall>,
    registered: Vec<String>,
    pass: Option<(Scn, Scn)>,
    redo: Vec<MinedRow>,
    rejected: HashSet<String>,
    fetch_failure: Option<String>,
    fetch_delay: Option<Duration>,
}

/// [`MiningEngine`] that serves rows from an in-memory redo stream.
///
/// Clones share state, so a test keeps one handle for inspection while the
/// session owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryMiningEngine {
    inner: Arc<Mutex<EngineState>>,
}

impl MemoryMiningEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append rows to the redo stream.
    pub fn push_rows(&self, rows: impl IntoIterator<Item = MinedRow>) {
        let mut state = self.inner.lock();
        state.redo.extend(rows);
        state.redo.sort_by_key(|r| r.scn);
    }

    /// Reject every future `add_segment` for `name`.
    pub fn reject_segment(&self, name: impl Into<String>) {
        self.inner.lock().rejected.insert(name.into());
    }

    pub fn accept_segment(&self, name: &str) {
        self.inner.lock().rejected.remove(name);
    }

    /// Fail the next `fetch_rows` with a mining error.
    pub fn fail_next_fetch(&self, reason: impl Into<String>) {
        self.inner.lock().fetch_failure = Some(reason.into());
    }

    /// Delay every `fetch_rows` by `delay`.
    pub fn set_fetch_delay(&self, delay: Option<Duration>) {
        self.inner.lock().fetch_delay = delay;
    }

    /// Every call received so far.
    pub fn calls(&self) -> Vec<EngineCall> {
        self.inner.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.inner.lock().calls.clear();
    }

    /// Currently registered file names.
    pub fn registered(&self) -> Vec<String> {
        self.inner.lock().registered.clone()
    }

    /// Range of the active pass, if any.
    pub fn active_pass(&self) -> Option<(Scn, Scn)> {
        self.inner.lock().pass
    }

    pub fn is_mining(&self) -> bool {
        self.inner.lock().pass.is_some()
    }
}

#[async_trait]
impl MiningEngine for MemoryMiningEngine {
    async fn add_segment(&mut self, name: &str) -> Result<()> {
        let mut state = self.inner.lock();
        state.calls.push(EngineCall::AddSegment(name.to_string()));
        if state.pass.is_some() {
            return Err(CdcError::mining("cannot add a log file during an active pass"));
        }
        if state.rejected.contains(name) {
            return Err(OracleError::from_message("ORA-01291: missing log file", Some(name)).into());
        }
        state.registered.push(name.to_string());
        Ok(())
    }

    async fn remove_all_segments(&mut self) -> Result<()> {
        let mut state = self.inner.lock();
        state.calls.push(EngineCall::RemoveAll);
        if state.pass.is_some() {
            return Err(CdcError::mining(
                "cannot remove log files during an active pass",
            ));
        }
        state.registered.clear();
        Ok(())
    }

    async fn start_mining(&mut self, start: &Scn, end: &Scn) -> Result<()> {
        let mut state = self.inner.lock();
        state.calls.push(EngineCall::StartMining {
            start: *start,
            end: *end,
        });
        if state.registered.is_empty() {
            return Err(OracleError::from_message(
                "ORA-01292: no log file has been specified",
                None,
            )
            .into());
        }
        state.pass = Some((*start, *end));
        Ok(())
    }

    async fn fetch_rows(&mut self) -> Result<Vec<MinedRow>> {
        let delay = {
            let mut state = self.inner.lock();
            state.calls.push(EngineCall::FetchRows);
            if let Some(reason) = state.fetch_failure.take() {
                return Err(OracleError::from_message(&reason, None).into());
            }
            state.fetch_delay
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let state = self.inner.lock();
        let (start, end) = state
            .pass
            .ok_or_else(|| {
                CdcError::from(OracleError::from_message(
                    "ORA-01306: no active mining pass",
                    None,
                ))
            })?;
        Ok(state
            .redo
            .iter()
            .filter(|r| r.scn >= start && r.scn < end)
            .cloned()
            .collect())
    }

    async fn end_mining(&mut self) -> Result<()> {
        let mut state = self.inner.lock();
        state.calls.push(EngineCall::EndMining);
        if state.pass.take().is_none() {
            return Err(OracleError::from_message(
                "ORA-01307: no LogMiner session is currently active",
                None,
            )
            .into());
        }
        Ok(())
    }

    async fn registered_segments(&mut self) -> Result<Vec<String>> {
        Ok(self.inner.lock().registered.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logminer::engine::LogMinerOp;
    use pretty_assertions::assert_eq;

    fn scn(v: u64) -> Scn {
        Scn::from(v)
    }

    #[tokio::test]
    async fn test_catalog_filters_online_by_position() {
        let catalog = MemoryLogCatalog::new();
        catalog.add_online(Segment::online("redo1", scn(100), scn(200), true));
        catalog.add_online(Segment::online("redo2", scn(200), Scn::UNKNOWN, false));

        let segments = catalog.online_segments(&scn(200)).await.unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].name, "redo2");
    }

    #[tokio::test]
    async fn test_catalog_applies_archive_margin() {
        let t = Utc::now();
        let catalog = MemoryLogCatalog::new();
        catalog.add_archived(Segment::archived("1_1.arc", scn(1), scn(100), t));
        catalog.set_clock(t + chrono::Duration::seconds(5));

        let visible = catalog
            .archived_segments(&scn(0), Duration::from_secs(5), None)
            .await
            .unwrap();
        assert_eq!(visible.len(), 1);

        let visible = catalog
            .archived_segments(&scn(0), Duration::from_secs(6), None)
            .await
            .unwrap();
        assert!(visible.is_empty());
    }

    #[tokio::test]
    async fn test_catalog_log_switch_and_archive() {
        let catalog = MemoryLogCatalog::new();
        catalog.add_online(Segment::online("redo1", scn(1), Scn::UNKNOWN, false));
        catalog.switch_log("redo2", scn(50));
        catalog.archive("redo1", "1_1.arc", Utc::now()).unwrap();

        let online = catalog.online_segments(&scn(0)).await.unwrap();
        assert_eq!(online[0].next_scn, scn(50));
        assert!(online[0].sealed);
        assert!(online[1].is_open());

        let archived = catalog
            .archived_segments(&scn(0), Duration::ZERO, None)
            .await
            .unwrap();
        assert_eq!(archived[0].low_scn, scn(1));
        assert_eq!(archived[0].next_scn, scn(50));

        assert!(catalog.archive("redo2", "1_2.arc", Utc::now()).is_err());
    }

    #[tokio::test]
    async fn test_catalog_unavailable() {
        let catalog = MemoryLogCatalog::new();
        catalog.set_unavailable(Some("ORA-03113: end-of-file on communication channel"));
        assert!(matches!(
            catalog.current_scn().await,
            Err(CdcError::SourceUnavailable(_))
        ));

        catalog.set_unavailable(None);
        assert_eq!(catalog.current_scn().await.unwrap(), Scn::UNKNOWN);
    }

    #[tokio::test]
    async fn test_engine_serves_rows_in_pass_range() {
        let mut engine = MemoryMiningEngine::new();
        engine.push_rows([
            MinedRow::new(scn(30), LogMinerOp::Insert),
            MinedRow::new(scn(10), LogMinerOp::Insert),
            MinedRow::new(scn(20), LogMinerOp::Commit),
        ]);

        engine.add_segment("redo1").await.unwrap();
        engine.start_mining(&scn(10), &scn(30)).await.unwrap();

        let rows = engine.fetch_rows().await.unwrap();
        let scns: Vec<Scn> = rows.iter().map(|r| r.scn).collect();
        assert_eq!(scns, vec![scn(10), scn(20)]);
    }

    #[tokio::test]
    async fn test_engine_requires_registered_files() {
        let mut engine = MemoryMiningEngine::new();
        assert!(engine.start_mining(&scn(1), &scn(2)).await.is_err());
    }

    #[tokio::test]
    async fn test_engine_failure_injection() {
        let mut engine = MemoryMiningEngine::new();
        engine.reject_segment("gone.arc");
        assert!(engine.add_segment("gone.arc").await.is_err());
        assert!(engine.registered().is_empty());

        engine.add_segment("redo1").await.unwrap();
        engine.start_mining(&scn(1), &scn(2)).await.unwrap();
        engine.fail_next_fetch("ORA-01013: user requested cancel");
        assert!(matches!(
            engine.fetch_rows().await.unwrap_err(),
            CdcError::Timeout(_)
        ));
        assert!(engine.fetch_rows().await.is_ok());
    }

    #[tokio::test]
    async fn test_engine_errors_carry_oracle_classification() {
        let mut engine = MemoryMiningEngine::new();
        engine.reject_segment("1_9.arc");
        match engine.add_segment("1_9.arc").await.unwrap_err() {
            CdcError::RegistrationFailed { segment, reason } => {
                assert_eq!(segment, "1_9.arc");
                assert!(reason.contains("ORA-01291"));
            }
            other => panic!("expected registration failure, got {other:?}"),
        }

        let err = engine.end_mining().await.unwrap_err();
        assert!(err.to_string().contains("ORA-01307"));
        assert_eq!(engine.calls().last(), Some(&EngineCall::EndMining));
    }
}
