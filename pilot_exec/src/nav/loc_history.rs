//! # Location history tracker
//!
//! Keeps a short buffer of accepted GPS fixes from which the speed and course
//! over ground are derived.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::collections::VecDeque;

use log::trace;

use comms_if::eqpt::PositionSample;

use super::geo;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Default number of fixes held in the history.
pub const DEFAULT_MAX_HISTORY_LEN: usize = 3;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Buffer of the most recent distinct fixes.
///
/// A fix is only accepted if its accuracy is within the threshold. An accurate
/// fix which lies within the threshold distance of every retained fix is not
/// added to the buffer (the vessel hasn't measurably moved) but still becomes
/// the "newest" point used for speed and course, so that a stationary vessel
/// reads a speed close to zero.
#[derive(Debug, Clone)]
pub struct LocationHistoryTracker {
    max_len: usize,

    /// Accuracy threshold and minimum separation of retained fixes.
    ///
    /// Units: meters
    accuracy_threshold_m: f64,

    history: VecDeque<PositionSample>,

    /// Most recent fix which passed the accuracy gate
    newest: Option<PositionSample>,
}

/// The result of offering a fix to the tracker.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FixOutcome {
    /// The fix was added to the history.
    Accepted,

    /// The fix was accurate but too close to the retained fixes to be added.
    Duplicate,

    /// The fix was less accurate than the threshold.
    RejectedAccuracy,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl LocationHistoryTracker {
    pub fn new(accuracy_threshold_m: f64) -> Self {
        Self::with_max_len(accuracy_threshold_m, DEFAULT_MAX_HISTORY_LEN)
    }

    /// Create a tracker holding up to `max_len` fixes (at least two).
    pub fn with_max_len(accuracy_threshold_m: f64, max_len: usize) -> Self {
        Self {
            max_len: max_len.max(2),
            accuracy_threshold_m,
            history: VecDeque::new(),
            newest: None,
        }
    }

    pub fn set_accuracy_threshold_m(&mut self, accuracy_threshold_m: f64) {
        self.accuracy_threshold_m = accuracy_threshold_m;
    }

    /// Offer a new fix to the tracker.
    pub fn add(&mut self, fix: &PositionSample) -> FixOutcome {
        if fix.accuracy_m > self.accuracy_threshold_m {
            trace!(
                "GPS accuracy {:.1} m is above {:.1} m, ignoring fix",
                fix.accuracy_m,
                self.accuracy_threshold_m
            );
            return FixOutcome::RejectedAccuracy;
        }

        self.newest = Some(*fix);

        let is_duplicate = !self.history.is_empty()
            && self.history.iter().all(|h| {
                geo::distance_between_points_m(&h.position, &fix.position)
                    < self.accuracy_threshold_m
            });

        if is_duplicate {
            return FixOutcome::Duplicate;
        }

        self.history.push_back(*fix);
        while self.history.len() > self.max_len {
            self.history.pop_front();
        }

        FixOutcome::Accepted
    }

    /// Number of fixes retained in the history.
    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Speed over ground from the oldest retained fix to the newest fix.
    ///
    /// Units: meters/second
    pub fn speed_mps(&self) -> Option<f64> {
        let (oldest, newest) = self.span()?;

        let dt = newest.time_s - oldest.time_s;
        if dt <= 0.0 {
            return None;
        }

        Some(geo::distance_between_points_m(&oldest.position, &newest.position) / dt)
    }

    /// Course over ground from the oldest retained fix to the newest fix, in
    /// [0, 360).
    pub fn heading_deg(&self) -> Option<f64> {
        let (oldest, newest) = self.span()?;

        Some(geo::calculate_bearing(&oldest.position, &newest.position))
    }

    pub fn clear(&mut self) {
        self.history.clear();
        self.newest = None;
    }

    /// The oldest retained and newest accurate fixes, if at least two fixes
    /// are retained.
    fn span(&self) -> Option<(&PositionSample, &PositionSample)> {
        if self.history.len() < 2 {
            return None;
        }

        Some((self.history.front()?, self.newest.as_ref()?))
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;
    use comms_if::eqpt::LatLon;

    fn fix_at(start: &LatLon, dist_m: f64, bearing: f64, acc: f64, t: f64) -> PositionSample {
        PositionSample::raw(geo::calculate_new_position(start, dist_m, bearing), acc, t)
    }

    #[test]
    fn test_undefined_until_two_fixes() {
        let start = LatLon::new(50.0, -1.0);
        let mut t = LocationHistoryTracker::new(7.0);

        assert_eq!(t.speed_mps(), None);
        assert_eq!(t.add(&fix_at(&start, 0.0, 0.0, 3.0, 0.0)), FixOutcome::Accepted);
        assert_eq!(t.speed_mps(), None);
        assert_eq!(t.heading_deg(), None);

        assert_eq!(t.add(&fix_at(&start, 20.0, 90.0, 3.0, 10.0)), FixOutcome::Accepted);
        assert_abs_diff_eq!(t.speed_mps().unwrap(), 2.0, epsilon = 1e-6);
        assert_abs_diff_eq!(t.heading_deg().unwrap(), 90.0, epsilon = 1e-3);
    }

    #[test]
    fn test_rejects_inaccurate() {
        let start = LatLon::new(50.0, -1.0);
        let mut t = LocationHistoryTracker::new(7.0);

        assert_eq!(
            t.add(&fix_at(&start, 0.0, 0.0, 7.5, 0.0)),
            FixOutcome::RejectedAccuracy
        );
        assert!(t.is_empty());
    }

    #[test]
    fn test_dedupe_and_stationary_speed() {
        let start = LatLon::new(50.0, -1.0);
        let mut t = LocationHistoryTracker::new(7.0);

        t.add(&fix_at(&start, 0.0, 0.0, 3.0, 0.0));
        t.add(&fix_at(&start, 30.0, 0.0, 3.0, 10.0));

        // Close to the last retained fix but not to the first
        assert_eq!(t.add(&fix_at(&start, 32.0, 0.0, 3.0, 20.0)), FixOutcome::Accepted);
        assert_eq!(t.len(), 3);

        // Now sit still, the new fix is near the latest but not the oldest
        // retained fix so it's still accepted, pushing the oldest out
        assert_eq!(t.add(&fix_at(&start, 31.0, 0.0, 3.0, 30.0)), FixOutcome::Accepted);
        assert_eq!(t.len(), 3);

        // Near every retained fix, only the newest point moves
        assert_eq!(t.add(&fix_at(&start, 31.0, 0.0, 3.0, 40.0)), FixOutcome::Duplicate);
        assert_eq!(t.len(), 3);

        // Oldest retained is at 30 m (t = 10), newest at 31 m (t = 40)
        assert_abs_diff_eq!(t.speed_mps().unwrap(), 1.0 / 30.0, epsilon = 1e-6);
    }

    #[test]
    fn test_history_is_bounded() {
        let start = LatLon::new(50.0, -1.0);
        let mut t = LocationHistoryTracker::new(5.0);

        for i in 0..10 {
            t.add(&fix_at(&start, i as f64 * 10.0, 0.0, 2.0, i as f64));
        }

        assert_eq!(t.len(), DEFAULT_MAX_HISTORY_LEN);

        // Oldest retained is fix 7, newest fix 9
        assert_abs_diff_eq!(t.speed_mps().unwrap(), 10.0, epsilon = 1e-6);
        assert_abs_diff_eq!(t.heading_deg().unwrap(), 0.0, epsilon = 1e-3);

        t.clear();
        assert_eq!(t.speed_mps(), None);
    }
}
