//! # GPS filter pipeline
//!
//! Raw fix -> accuracy gate -> Kalman smoothing -> location history, producing
//! a filtered fix augmented with speed and course over ground.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::trace;
use serde::{Deserialize, Serialize};

use comms_if::eqpt::PositionSample;

use super::loc_history::LocationHistoryTracker;
use crate::filters::KalmanLocationFilter;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters of the GPS filter pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GpsParams {
    /// Fixes less accurate than this are ignored.
    ///
    /// Units: meters
    pub min_required_accuracy_m: f64,

    /// Initial Kalman process noise.
    ///
    /// Units: meters/second
    pub kalman_q_mps: f64,

    /// Lower limit on the process noise derived from the speed over ground.
    /// Without it a stationary vessel would freeze the estimate.
    ///
    /// Units: meters/second
    pub kalman_min_q_mps: f64,
}

/// The GPS filter pipeline.
#[derive(Debug, Clone)]
pub struct GpsFilter {
    params: GpsParams,
    kalman: KalmanLocationFilter,
    history: LocationHistoryTracker,
    latest: Option<PositionSample>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for GpsParams {
    fn default() -> Self {
        Self {
            min_required_accuracy_m: 7.0,
            kalman_q_mps: 3.0,
            kalman_min_q_mps: 0.5,
        }
    }
}

impl GpsFilter {
    pub fn new(params: &GpsParams) -> Self {
        Self {
            params: params.clone(),
            kalman: KalmanLocationFilter::new(params.kalman_q_mps),
            history: LocationHistoryTracker::new(params.min_required_accuracy_m),
            latest: None,
        }
    }

    pub fn set_params(&mut self, params: &GpsParams) {
        self.history
            .set_accuracy_threshold_m(params.min_required_accuracy_m);
        self.params = params.clone();
    }

    /// Process a raw fix.
    ///
    /// Returns `None` if the fix is not accurate enough to be used, in which
    /// case nothing in the pipeline is updated.
    pub fn process(&mut self, raw: &PositionSample) -> Option<PositionSample> {
        if raw.accuracy_m > self.params.min_required_accuracy_m || !raw.accuracy_m.is_finite() {
            trace!("Ignoring GPS fix with accuracy {:.1} m", raw.accuracy_m);
            return None;
        }

        let mut filtered = self.kalman.process(raw);
        self.history.add(&filtered);

        let speed_mps = self.history.speed_mps();
        if let Some(s) = speed_mps {
            self.kalman.set_q_mps(s.max(self.params.kalman_min_q_mps));
        }

        filtered.speed_mps = speed_mps;
        filtered.heading_deg = self.history.heading_deg();

        self.latest = Some(filtered);
        Some(filtered)
    }

    /// The most recent filtered fix.
    pub fn latest(&self) -> Option<&PositionSample> {
        self.latest.as_ref()
    }

    /// Most recent speed over ground, or `None` if it's not yet known.
    ///
    /// Units: meters/second
    pub fn speed_mps(&self) -> Option<f64> {
        self.latest.and_then(|l| l.speed_mps)
    }

    pub fn reset(&mut self) {
        self.kalman = KalmanLocationFilter::new(self.params.kalman_q_mps);
        self.history.clear();
        self.latest = None;
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
