//! Segment catalog reader
//!
//! Read-only view over the two redo inventories:
//!
//! | Inventory | Oracle view | Content |
//! |-----------|-------------|---------|
//! | Online | `V$LOG` / `V$LOGFILE` | Log groups, the CURRENT one still being written |
//! | Archived | `V$ARCHIVED_LOG` | Sealed copies of filled online logs |
//!
//! A filled online log and its archived copy describe the same SCN range and
//! share `NEXT_CHANGE#`. The [`WindowResolver`](super::WindowResolver) merges
//! them; implementations of [`LogCatalog`] just report what the views say.

use super::scn::Scn;
use super::segment::Segment;
use crate::common::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Capability interface over the database's log inventories.
///
/// All methods are side-effect free. Failures surface as
/// [`CdcError::SourceUnavailable`](crate::common::CdcError::SourceUnavailable);
/// an implementation must never return a partial list.
#[async_trait]
pub trait LogCatalog: Send + Sync {
    /// Online segments whose range could hold positions at or after `as_of`,
    /// ordered by `low_scn`.
    async fn online_segments(&self, as_of: &Scn) -> Result<Vec<Segment>>;

    /// Sealed archived segments with `next_scn > after`, ordered by `low_scn`,
    /// leaving out any whose archival completed less than `margin` ago.
    /// With `dest_id` set, only archives written to that destination.
    async fn archived_segments(
        &self,
        after: &Scn,
        margin: Duration,
        dest_id: Option<u32>,
    ) -> Result<Vec<Segment>>;

    /// Present write position of the database.
    async fn current_scn(&self) -> Result<Scn>;
}

/// Archive visibility rule shared by every catalog implementation.
///
/// An archived segment is visible once `now >= completed_at + margin`. With a
/// zero margin a segment without a completion time is visible too; with a
/// positive margin it is not, since its age cannot be established.
pub fn archived_segment_visible(
    segment: &Segment,
    after: &Scn,
    margin: Duration,
    now: DateTime<Utc>,
) -> bool {
    if !segment.is_archived() || !segment.sealed {
        return false;
    }
    if segment.next_scn <= *after {
        return false;
    }

    match segment.completed_at {
        Some(completed_at) => {
            let Ok(margin) = chrono::Duration::from_std(margin) else {
                return false;
            };
            completed_at
                .checked_add_signed(margin)
                .is_some_and(|visible_at| now >= visible_at)
        }
        None => margin.is_zero(),
    }
}
