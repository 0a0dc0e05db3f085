//! Watched-coverage tracking
//!
//! This module accumulates the disjoint time intervals a viewer has
//! actually had playing on screen and reports a coverage percentage
//! against the effective end of the video. The interval set is kept
//! sorted and pairwise non-overlapping after every insertion, with
//! nearly-touching segments coalesced so player jitter cannot fragment
//! an honest viewing into dozens of slivers.

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::constants::coverage::{MERGE_TOLERANCE, SNAP_PERCENT, SNAP_REMAINDER};

/// A half-open watched interval `[start, end)` in video seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WatchSegment {
    /// Start of the interval, inclusive
    pub start: f64,
    /// End of the interval, exclusive; always greater than `start`
    pub end: f64,
}

impl WatchSegment {
    /// Length of this segment in seconds
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Accumulates watched intervals and reports coverage
///
/// The tracker holds the closed segment set plus at most one open
/// segment (`watching`/`seg_start`) that grows while playback is active
/// with no overlay in the way. It is reset only at session start.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoverageTracker {
    /// Closed segments, sorted by start and pairwise non-overlapping
    segments: Vec<WatchSegment>,
    /// Whether a segment is currently accumulating
    watching: bool,
    /// Start of the open segment; only meaningful while `watching`
    seg_start: f64,
}

impl CoverageTracker {
    /// Inserts a closed segment and re-merges the set
    ///
    /// A no-op when `b <= a` or either bound is not finite. Segments
    /// within the merge tolerance of each other are coalesced into one,
    /// so the set invariant (sorted, disjoint) holds after every call.
    pub fn add_segment(&mut self, a: f64, b: f64) {
        if !a.is_finite() || !b.is_finite() || b <= a {
            return;
        }

        let merged = self
            .segments
            .iter()
            .copied()
            .chain(std::iter::once(WatchSegment { start: a, end: b }))
            .sorted_by(|x, y| x.start.total_cmp(&y.start))
            .coalesce(|current, next| {
                if next.start <= current.end + MERGE_TOLERANCE {
                    Ok(WatchSegment {
                        start: current.start,
                        end: current.end.max(next.end),
                    })
                } else {
                    Err((current, next))
                }
            })
            .collect();
        self.segments = merged;
    }

    /// Opens the accumulating segment at `at`, if none is open
    pub fn start_watch(&mut self, at: f64) {
        if !self.watching {
            self.watching = true;
            self.seg_start = at;
        }
    }

    /// Closes the accumulating segment at `at`; idempotent when not watching
    pub fn stop_watch(&mut self, at: f64) {
        if self.watching {
            self.watching = false;
            let start = self.seg_start;
            self.add_segment(start, at);
        }
    }

    /// Closes the open segment at `close_at` and reopens at `reopen_at`
    ///
    /// Used when a position jump is observed mid-accumulation: coverage
    /// must never silently span the skipped gap.
    pub fn split_at(&mut self, close_at: f64, reopen_at: f64) {
        if self.watching {
            let start = self.seg_start;
            self.add_segment(start, close_at);
            self.seg_start = reopen_at;
        }
    }

    /// Whether a segment is currently accumulating
    pub fn watching(&self) -> bool {
        self.watching
    }

    /// The closed segment set, sorted and disjoint
    pub fn segments(&self) -> &[WatchSegment] {
        &self.segments
    }

    /// The effective end of the video for coverage purposes
    ///
    /// The authored cut-off wins over the media duration when it is a
    /// positive finite number and the duration is known; otherwise the
    /// duration stands.
    pub fn effective_end(end_at: Option<f64>, duration: f64) -> f64 {
        match end_at {
            Some(end_at) if end_at.is_finite() && end_at > 0.0 && duration > 0.0 => {
                end_at.min(duration)
            }
            _ => duration,
        }
    }

    /// Total watched seconds up to `now`, clamped to `effective_end`
    ///
    /// Sums the closed segments plus the open segment's elapsed time if
    /// still watching. Time past the effective end never counts.
    pub fn watched_seconds(&self, now: f64, effective_end: f64) -> f64 {
        if effective_end <= 0.0 {
            return 0.0;
        }

        let mut total: f64 = self
            .segments
            .iter()
            .map(|segment| (segment.end.min(effective_end) - segment.start.min(effective_end)).max(0.0))
            .sum();

        if self.watching && now > self.seg_start {
            total += (now.min(effective_end) - self.seg_start.min(effective_end)).max(0.0);
        }

        total.clamp(0.0, effective_end)
    }

    /// Coverage percentage in `[0, 100]` against the effective end
    ///
    /// Snaps to exactly 100 when the unwatched remainder is at most one
    /// second or the raw percentage reaches the snap threshold. The snap
    /// tolerates player rounding and buffering jitter; it is what lets
    /// the watched-to-end condition actually fire.
    pub fn watched_percent(&self, now: f64, duration: f64, end_at: Option<f64>) -> f64 {
        let effective_end = Self::effective_end(end_at, duration);
        if effective_end <= 0.0 {
            return 0.0;
        }

        let watched = self.watched_seconds(now, effective_end);
        let raw = (watched / effective_end * 100.0).clamp(0.0, 100.0);

        if effective_end - watched <= SNAP_REMAINDER || raw >= SNAP_PERCENT {
            100.0
        } else {
            raw
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn assert_invariants(tracker: &CoverageTracker) {
        let segments = tracker.segments();
        for window in segments.windows(2) {
            assert!(window[0].start < window[1].start, "segments must be sorted");
            assert!(
                window[1].start > window[0].end + MERGE_TOLERANCE,
                "segments must be disjoint beyond the merge tolerance"
            );
        }
        for segment in segments {
            assert!(segment.end > segment.start);
        }
    }

    #[test]
    fn test_add_segment_rejects_degenerate_input() {
        let mut tracker = CoverageTracker::default();
        tracker.add_segment(5.0, 5.0);
        tracker.add_segment(7.0, 3.0);
        tracker.add_segment(f64::NAN, 10.0);
        tracker.add_segment(0.0, f64::INFINITY);
        assert!(tracker.segments().is_empty());
    }

    #[test]
    fn test_add_segment_merges_within_tolerance() {
        let mut tracker = CoverageTracker::default();
        tracker.add_segment(0.0, 10.0);
        tracker.add_segment(10.2, 20.0);
        assert_eq!(tracker.segments().len(), 1);
        assert_eq!(tracker.segments()[0], WatchSegment { start: 0.0, end: 20.0 });
        assert_invariants(&tracker);
    }

    #[test]
    fn test_add_segment_keeps_distant_segments_apart() {
        let mut tracker = CoverageTracker::default();
        tracker.add_segment(0.0, 10.0);
        tracker.add_segment(15.0, 20.0);
        assert_eq!(tracker.segments().len(), 2);
        assert_invariants(&tracker);
    }

    #[test]
    fn test_union_measure_survives_overlapping_inserts() {
        let mut tracker = CoverageTracker::default();
        tracker.add_segment(0.0, 10.0);
        tracker.add_segment(5.0, 12.0);
        tracker.add_segment(11.0, 15.0);
        tracker.add_segment(30.0, 40.0);
        assert_invariants(&tracker);

        let total: f64 = tracker.segments().iter().map(WatchSegment::duration).sum();
        assert!((total - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_insert_order_does_not_matter() {
        let inputs = [(20.0, 25.0), (0.0, 5.0), (4.0, 9.0), (24.9, 30.0)];
        let mut forward = CoverageTracker::default();
        for (a, b) in inputs {
            forward.add_segment(a, b);
        }
        let mut backward = CoverageTracker::default();
        for (a, b) in inputs.iter().rev() {
            backward.add_segment(*a, *b);
        }
        assert_eq!(forward.segments(), backward.segments());
    }

    #[test]
    fn test_stop_watch_is_idempotent() {
        let mut tracker = CoverageTracker::default();
        tracker.stop_watch(10.0);
        assert!(tracker.segments().is_empty());

        tracker.start_watch(0.0);
        tracker.stop_watch(8.0);
        tracker.stop_watch(12.0);
        assert_eq!(tracker.segments().len(), 1);
        assert_eq!(tracker.segments()[0].end, 8.0);
    }

    #[test]
    fn test_split_at_never_spans_the_gap() {
        let mut tracker = CoverageTracker::default();
        tracker.start_watch(0.0);
        tracker.split_at(10.0, 30.0);
        assert!(tracker.watching());
        tracker.stop_watch(35.0);

        let segments = tracker.segments();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0], WatchSegment { start: 0.0, end: 10.0 });
        assert_eq!(segments[1], WatchSegment { start: 30.0, end: 35.0 });
    }

    #[test]
    fn test_watched_seconds_includes_open_segment() {
        let mut tracker = CoverageTracker::default();
        tracker.add_segment(0.0, 10.0);
        tracker.start_watch(20.0);
        assert!((tracker.watched_seconds(25.0, 60.0) - 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_effective_end_prefers_valid_cutoff() {
        assert_eq!(CoverageTracker::effective_end(Some(30.0), 60.0), 30.0);
        assert_eq!(CoverageTracker::effective_end(Some(90.0), 60.0), 60.0);
        assert_eq!(CoverageTracker::effective_end(None, 60.0), 60.0);
        assert_eq!(CoverageTracker::effective_end(Some(0.0), 60.0), 60.0);
        assert_eq!(CoverageTracker::effective_end(Some(-5.0), 60.0), 60.0);
        assert_eq!(CoverageTracker::effective_end(Some(30.0), 0.0), 0.0);
    }

    #[test]
    fn test_watched_percent_is_monotone_without_seeks() {
        let mut tracker = CoverageTracker::default();
        tracker.start_watch(0.0);

        let mut previous = 0.0;
        let mut now = 0.0;
        while now <= 60.0 {
            let percent = tracker.watched_percent(now, 60.0, None);
            assert!(percent >= previous, "coverage regressed at now={now}");
            previous = percent;
            now += 0.25;
        }
    }

    #[test]
    fn test_watched_percent_snaps_near_the_end() {
        let mut tracker = CoverageTracker::default();
        tracker.add_segment(0.0, 59.2);
        // remainder of 0.8s is within the snap tolerance
        assert_eq!(tracker.watched_percent(59.2, 60.0, None), 100.0);

        let mut tracker = CoverageTracker::default();
        tracker.add_segment(0.0, 58.5);
        // 97.5% raw crosses the percentage snap threshold
        assert_eq!(tracker.watched_percent(58.5, 60.0, None), 100.0);

        let mut tracker = CoverageTracker::default();
        tracker.add_segment(0.0, 30.0);
        assert_eq!(tracker.watched_percent(30.0, 60.0, None), 50.0);
    }

    #[test]
    fn test_cutoff_reaches_full_coverage_before_duration() {
        let mut tracker = CoverageTracker::default();
        tracker.start_watch(0.0);
        // at 29s against a 30s cutoff the remainder is 1s, which snaps
        assert_eq!(tracker.watched_percent(29.0, 60.0, Some(30.0)), 100.0);
        // while against the full 60s the viewer is nowhere near done
        assert!(tracker.watched_percent(29.0, 60.0, None) < 50.1);
    }

    #[test]
    fn test_time_past_effective_end_never_counts() {
        let mut tracker = CoverageTracker::default();
        tracker.add_segment(0.0, 50.0);
        assert!((tracker.watched_seconds(50.0, 30.0) - 30.0).abs() < 1e-9);
        assert_eq!(tracker.watched_percent(50.0, 60.0, Some(30.0)), 100.0);
    }
}
