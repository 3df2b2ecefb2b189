//! Log segments and resolved mining windows

use super::scn::Scn;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which inventory a segment was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentOrigin {
    /// Online redo log (`V$LOG`), possibly still being written
    Online,
    /// Archived log (`V$ARCHIVED_LOG`), always sealed
    Archived,
}

impl SegmentOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Archived => "archived",
        }
    }
}

impl fmt::Display for SegmentOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One redo log file as described by the catalog.
///
/// Covers `[low_scn, next_scn)`. An open `next_scn` ([`Scn::UNKNOWN`]) marks
/// the online log currently being written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    /// File name (path) within its source
    pub name: String,
    /// Inclusive lower bound (`FIRST_CHANGE#`)
    pub low_scn: Scn,
    /// Exclusive upper bound (`NEXT_CHANGE#`), the dedup key
    pub next_scn: Scn,
    /// Inventory the segment came from
    pub origin: SegmentOrigin,
    /// Finalized; no further writes
    pub sealed: bool,
    /// Log sequence number (`SEQUENCE#`), when the catalog reports it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<u64>,
    /// Archival completion time (`COMPLETION_TIME`), archived segments only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Archive destination (`DEST_ID`), archived segments only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dest_id: Option<u32>,
}

impl Segment {
    /// Online segment. `next_scn` may be [`Scn::UNKNOWN`] for the current log.
    pub fn online(name: impl Into<String>, low_scn: Scn, next_scn: Scn, sealed: bool) -> Self {
        Self {
            name: name.into(),
            low_scn,
            next_scn,
            origin: SegmentOrigin::Online,
            sealed,
            sequence: None,
            completed_at: None,
            dest_id: None,
        }
    }

    /// Archived segment, sealed at `completed_at`.
    pub fn archived(
        name: impl Into<String>,
        low_scn: Scn,
        next_scn: Scn,
        completed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            name: name.into(),
            low_scn,
            next_scn,
            origin: SegmentOrigin::Archived,
            sealed: true,
            sequence: None,
            completed_at: Some(completed_at),
            dest_id: None,
        }
    }

    /// Set the log sequence number.
    pub fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = Some(sequence);
        self
    }

    /// Set the archive destination.
    pub fn with_dest_id(mut self, dest_id: u32) -> Self {
        self.dest_id = Some(dest_id);
        self
    }

    pub fn is_online(&self) -> bool {
        self.origin == SegmentOrigin::Online
    }

    pub fn is_archived(&self) -> bool {
        self.origin == SegmentOrigin::Archived
    }

    /// Upper bound not yet known (log still being written).
    pub fn is_open(&self) -> bool {
        self.next_scn.is_unknown()
    }

    /// Whether any position `>= scn` can live in this segment.
    pub fn reaches_past(&self, scn: &Scn) -> bool {
        self.is_open() || self.next_scn > *scn
    }

    /// Whether `scn` falls inside `[low_scn, next_scn)`.
    pub fn contains(&self, scn: &Scn) -> bool {
        self.low_scn <= *scn && self.reaches_past(scn)
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_open() {
            write!(f, "{} {} [{}, open)", self.origin, self.name, self.low_scn)
        } else {
            write!(
                f,
                "{} {} [{}, {})",
                self.origin, self.name, self.low_scn, self.next_scn
            )
        }
    }
}

/// A catalog contradiction settled by the tie-break rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogInconsistency {
    /// Shared `next_scn` of the conflicting candidates
    pub next_scn: Scn,
    /// Segment that was kept
    pub kept: String,
    /// Segments that were discarded
    pub discarded: Vec<String>,
}

impl fmt::Display for CatalogInconsistency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} candidates share NEXT_CHANGE# {}; kept {}, discarded {:?}",
            self.discarded.len() + 1,
            self.next_scn,
            self.kept,
            self.discarded
        )
    }
}

/// Ordered, gap-free, duplicate-free set of segments for one mining pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
    /// Position the window was resolved from
    pub start_scn: Scn,
    /// Segments in ascending `low_scn` order
    pub segments: Vec<Segment>,
    /// Exclusive upper bound of what the segments cover
    pub covers_up_to: Scn,
    /// Tie-break warnings raised while merging
    pub inconsistencies: Vec<CatalogInconsistency>,
}

impl Window {
    /// Nothing new yet: no segments, coverage ends where it started.
    pub fn empty(start_scn: Scn) -> Self {
        Self {
            start_scn,
            segments: Vec::new(),
            covers_up_to: start_scn,
            inconsistencies: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Segment names in registration order.
    pub fn segment_names(&self) -> Vec<&str> {
        self.segments.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn online_count(&self) -> usize {
        self.segments.iter().filter(|s| s.is_online()).count()
    }

    pub fn archived_count(&self) -> usize {
        self.segments.iter().filter(|s| s.is_archived()).count()
    }
}
