//! Window invariants as assertions with readable failure messages

use rivven_logminer::logminer::{Scn, SegmentOrigin, Window};
use std::collections::HashSet;

pub trait WindowAssertions {
    /// Adjacent segments share a boundary and only the last may be open.
    fn assert_contiguous(&self);

    /// No two segments share `next_scn`.
    fn assert_no_duplicates(&self);

    /// The first segment contains `scn`.
    fn assert_starts_at(&self, scn: Scn);

    fn assert_origins(&self, expected: &[SegmentOrigin]);
}

impl WindowAssertions for Window {
    fn assert_contiguous(&self) {
        for pair in self.segments.windows(2) {
            assert!(
                !pair[0].is_open(),
                "open segment {} is not last in {:#?}",
                pair[0],
                self.segments
            );
            assert_eq!(
                pair[0].next_scn, pair[1].low_scn,
                "hole or overlap between {} and {}",
                pair[0], pair[1]
            );
        }
    }

    fn assert_no_duplicates(&self) {
        let mut seen = HashSet::new();
        for segment in &self.segments {
            assert!(
                seen.insert(segment.next_scn),
                "duplicate NEXT_CHANGE# {} in {:?}",
                segment.next_scn,
                self.segment_names()
            );
        }
    }

    fn assert_starts_at(&self, scn: Scn) {
        let first = self
            .segments
            .first()
            .unwrap_or_else(|| panic!("empty window cannot start at {}", scn));
        assert!(
            first.contains(&scn),
            "first segment {} does not contain {}",
            first,
            scn
        );
    }

    fn assert_origins(&self, expected: &[SegmentOrigin]) {
        let origins: Vec<SegmentOrigin> = self.segments.iter().map(|s| s.origin).collect();
        assert_eq!(origins, expected, "segments: {:?}", self.segment_names());
    }
}
