//! Window resolution
//!
//! Turns the two catalog inventories into the ordered list of log files to
//! register for one mining pass.
//!
//! ```text
//!   online:   [100,200) [200,300) [300,open)
//!   archived: [ 50,100) [100,200) [200,300)
//!                        └── same NEXT_CHANGE# as an online log: dropped
//!   window:   [ 50,100) [100,200) [200,300) [300,open)
//!              archived  online    online    online
//! ```
//!
//! Online logs always win a duplicate: the range of the CURRENT log is still
//! growing and only the online file has the latest redo.

use super::catalog::LogCatalog;
use super::scn::Scn;
use super::segment::{CatalogInconsistency, Segment, Window};
use crate::common::{CdcError, Result};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Resolves mining windows against a [`LogCatalog`].
pub struct WindowResolver<C> {
    catalog: Arc<C>,
    archive_dest_id: Option<u32>,
}

impl<C: LogCatalog> WindowResolver<C> {
    pub fn new(catalog: Arc<C>) -> Self {
        Self {
            catalog,
            archive_dest_id: None,
        }
    }

    /// Read archived logs from one destination only.
    pub fn with_archive_dest(mut self, dest_id: Option<u32>) -> Self {
        self.archive_dest_id = dest_id;
        self
    }

    pub fn catalog(&self) -> &Arc<C> {
        &self.catalog
    }

    /// Compute the window covering `[start, now)`.
    ///
    /// Returns an empty window when `start` is at or past the current SCN.
    /// Fails with [`CdcError::WindowGap`] when the catalog cannot cover the
    /// range without a hole.
    pub async fn resolve(&self, start: &Scn, margin: Duration) -> Result<Window> {
        let current = self.catalog.current_scn().await?;
        if current.is_unknown() {
            return Err(CdcError::source_unavailable(
                "catalog reported no current SCN",
            ));
        }
        if *start >= current {
            trace!("Start SCN {} is at current SCN {}, nothing to mine", start, current);
            return Ok(Window::empty(*start));
        }

        let online = self.catalog.online_segments(start).await?;
        let archived = self
            .catalog
            .archived_segments(start, margin, self.archive_dest_id)
            .await?;
        trace!(
            "Catalog returned {} online and {} archived segments for SCN {}",
            online.len(),
            archived.len(),
            start
        );

        let window = build_window(*start, current, online, archived)?;

        for inconsistency in &window.inconsistencies {
            warn!("Catalog inconsistency, tie-break applied: {}", inconsistency);
        }
        debug!(
            "Resolved window from SCN {} to {}: {} segments ({} online, {} archived)",
            window.start_scn,
            window.covers_up_to,
            window.len(),
            window.online_count(),
            window.archived_count()
        );

        Ok(window)
    }
}

/// Build a window from already-fetched inventories.
///
/// `current` caps the coverage of an open (still written) last segment.
pub fn build_window(
    start: Scn,
    current: Scn,
    online: Vec<Segment>,
    archived: Vec<Segment>,
) -> Result<Window> {
    let (mut segments, inconsistencies) = merge_segments(online, archived)?;

    segments.retain(|s| s.reaches_past(&start));
    validate_contiguity(&start, &segments)?;

    let covers_up_to = match segments.last() {
        None => start,
        Some(last) if last.is_open() => current.max(start),
        Some(last) => last.next_scn,
    };

    Ok(Window {
        start_scn: start,
        segments,
        covers_up_to,
        inconsistencies,
    })
}

/// Merge both inventories by `next_scn` and sort by `low_scn`.
///
/// Within a group sharing `next_scn` the online candidate wins, then the
/// one with the larger `low_scn`. Any group other than one online plus one
/// archived candidate is reported as a [`CatalogInconsistency`].
///
/// Open segments have no `next_scn` to group on and are kept as they are.
/// More than one open segment fails with
/// [`CdcError::CatalogInconsistency`].
pub fn merge_segments(
    online: Vec<Segment>,
    archived: Vec<Segment>,
) -> Result<(Vec<Segment>, Vec<CatalogInconsistency>)> {
    let mut groups: BTreeMap<Scn, Vec<Segment>> = BTreeMap::new();
    let mut open = Vec::new();
    for segment in online.into_iter().chain(archived) {
        if segment.is_open() {
            open.push(segment);
        } else {
            groups.entry(segment.next_scn).or_default().push(segment);
        }
    }

    if open.len() > 1 {
        let names: Vec<String> = open.iter().map(|s| s.to_string()).collect();
        return Err(CdcError::catalog_inconsistency(format!(
            "more than one log is still being written: {}",
            names.join(", ")
        )));
    }

    let mut merged = Vec::with_capacity(groups.len() + open.len());
    let mut inconsistencies = Vec::new();

    for (next_scn, mut candidates) in groups {
        if candidates.len() > 1 {
            candidates.sort_by(prefer);
            let online = candidates.iter().filter(|s| s.is_online()).count();
            let expected_pair = candidates.len() == 2 && online == 1;
            if !expected_pair {
                inconsistencies.push(CatalogInconsistency {
                    next_scn,
                    kept: candidates[0].name.clone(),
                    discarded: candidates[1..].iter().map(|s| s.name.clone()).collect(),
                });
            }
        }
        if let Some(winner) = candidates.into_iter().next() {
            merged.push(winner);
        }
    }
    merged.extend(open);

    merged.sort_by(|a, b| {
        a.low_scn
            .cmp(&b.low_scn)
            .then_with(|| a.is_open().cmp(&b.is_open()))
            .then_with(|| a.next_scn.cmp(&b.next_scn))
    });

    Ok((merged, inconsistencies))
}

/// Tie-break order: online first, then the more recent `low_scn`.
fn prefer(a: &Segment, b: &Segment) -> Ordering {
    b.is_online()
        .cmp(&a.is_online())
        .then_with(|| b.low_scn.cmp(&a.low_scn))
}

fn validate_contiguity(start: &Scn, segments: &[Segment]) -> Result<()> {
    let Some(first) = segments.first() else {
        return Ok(());
    };
    if !start.is_unknown() && first.low_scn > *start {
        return Err(CdcError::window_gap(*start, first.low_scn));
    }

    for pair in segments.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        if a.is_open() {
            return Err(CdcError::catalog_inconsistency(format!(
                "{} is still being written but is followed by {}",
                a, b
            )));
        }
        match a.next_scn.cmp(&b.low_scn) {
            Ordering::Equal => {}
            Ordering::Less => return Err(CdcError::window_gap(a.next_scn, b.low_scn)),
            Ordering::Greater => {
                return Err(CdcError::catalog_inconsistency(format!(
                    "{} overlaps {}",
                    a, b
                )))
            }
        }
    }
    Ok(())
}
