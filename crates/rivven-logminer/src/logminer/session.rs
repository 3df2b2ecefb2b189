//! Mining session controller
//!
//! Owns the mining engine and its registered file list. The session moves
//! through
//!
//! ```text
//!  ┌───────┐ register ┌───────────┐ start_pass ┌────────┐
//!  │ Empty │─────────▶│ Populated │───────────▶│ Active │
//!  └───────┘          └───────────┘◀───────────└────────┘
//!      ▲                    │        stop_pass      │
//!      └──────── clear ─────┴───────────────────────┘
//! ```
//!
//! `clear()` is accepted in every state, so a cycle that failed halfway (or a
//! process that restarted mid-cycle) always recovers by clearing first.

use super::engine::{MinedRow, MiningEngine};
use super::scn::Scn;
use super::segment::Window;
use crate::common::{CdcError, Result};
use std::fmt;
use tracing::{debug, trace, warn};

/// Lifecycle state of the mining session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No files registered
    Empty,
    /// Files registered, no pass running
    Populated,
    /// Pass running; rows may be fetched
    Active,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Empty => "empty",
            Self::Populated => "populated",
            Self::Active => "active",
        };
        f.write_str(s)
    }
}

/// Exclusive owner of a [`MiningEngine`].
pub struct MiningSession<E> {
    engine: E,
    state: SessionState,
    registered: Vec<String>,
    /// Set once a clear has left the engine with no pass running
    engine_idle: bool,
}

impl<E: MiningEngine> MiningSession<E> {
    /// Wrap an engine. The engine's pass and registration list are assumed
    /// unknown (a previous owner may have crashed mid-cycle), so the first
    /// cycle must [`clear`](Self::clear) before registering.
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            state: SessionState::Empty,
            registered: Vec::new(),
            engine_idle: false,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Files registered by this controller, in registration order.
    pub fn registered(&self) -> &[String] {
        &self.registered
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Empty the engine's registration list, ending any pass first.
    ///
    /// Idempotent. Unless the engine is known to be idle, a pass is ended
    /// even when this controller did not start one. An error from ending it
    /// is logged and does not prevent the removal.
    pub async fn clear(&mut self) -> Result<()> {
        if self.state != SessionState::Empty || !self.engine_idle {
            if let Err(e) = self.engine.end_mining().await {
                if self.state == SessionState::Active {
                    warn!("Failed to end active mining pass during clear: {}", e);
                } else {
                    trace!("No stale mining pass to end: {}", e);
                }
            }
        }

        self.engine_idle = false;
        self.engine.remove_all_segments().await?;
        self.engine_idle = true;
        if !self.registered.is_empty() {
            trace!("Cleared {} registered log files", self.registered.len());
        }
        self.registered.clear();
        self.state = SessionState::Empty;
        Ok(())
    }

    /// Register the window's segments in order.
    ///
    /// On the first rejected file the session is cleared and
    /// [`CdcError::RegistrationFailed`] names that file; an incomplete window
    /// is never left registered.
    pub async fn register(&mut self, window: &Window) -> Result<()> {
        if self.state != SessionState::Empty {
            return Err(CdcError::invalid_state(format!(
                "cannot register a window into a {} session; clear it first",
                self.state
            )));
        }

        for segment in &window.segments {
            if let Err(e) = self.engine.add_segment(&segment.name).await {
                warn!("Log file {} rejected by mining engine: {}", segment, e);
                if let Err(clear_err) = self.clear().await {
                    warn!("Failed to clear after registration failure: {}", clear_err);
                }
                return Err(CdcError::registration_failed(
                    segment.name.clone(),
                    e.to_string(),
                ));
            }
            trace!("Registered {}", segment);
            self.registered.push(segment.name.clone());
        }

        if !self.registered.is_empty() {
            self.state = SessionState::Populated;
        }
        debug!("Registered {} log files", self.registered.len());
        Ok(())
    }

    /// Start reading `[start, end)` from the registered files.
    pub async fn start_pass(&mut self, start: &Scn, end: &Scn) -> Result<()> {
        if self.state != SessionState::Populated {
            return Err(CdcError::invalid_state(format!(
                "cannot start a pass on a {} session",
                self.state
            )));
        }
        self.engine_idle = false;
        self.engine.start_mining(start, end).await?;
        self.state = SessionState::Active;
        trace!("Mining pass started for [{}, {})", start, end);
        Ok(())
    }

    /// Rows of the active pass.
    pub async fn fetch_rows(&mut self) -> Result<Vec<MinedRow>> {
        if self.state != SessionState::Active {
            return Err(CdcError::invalid_state(format!(
                "cannot fetch rows from a {} session",
                self.state
            )));
        }
        self.engine.fetch_rows().await
    }

    /// End the active pass. A no-op when no pass is running.
    pub async fn stop_pass(&mut self) -> Result<()> {
        if self.state != SessionState::Active {
            return Ok(());
        }
        self.engine.end_mining().await?;
        self.state = SessionState::Populated;
        trace!("Mining pass stopped");
        Ok(())
    }

    /// Files the engine itself reports as registered.
    pub async fn registered_segments(&mut self) -> Result<Vec<String>> {
        self.engine.registered_segments().await
    }
}
