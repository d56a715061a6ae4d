//! # Kalman position filter
//!
//! A minimal Kalman filter which smooths latitude and longitude independently
//! using a single shared scalar variance.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::trace;

use comms_if::eqpt::{LatLon, PositionSample};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Fixes claiming to be better than this are treated as this accurate.
///
/// Units: meters
pub const MIN_ACCURACY_M: f64 = 1.0;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Kalman filter for GPS fixes.
///
/// The single free parameter `q` (meters/second) describes how quickly the
/// accuracy of the estimate decays when no new fixes arrive.
#[derive(Debug, Clone)]
pub struct KalmanLocationFilter {
    q_mps: f64,
    estimate: Option<Estimate>,
}

#[derive(Debug, Clone, Copy)]
struct Estimate {
    position: LatLon,

    /// Variance of the estimate
    ///
    /// Units: meters^2
    variance: f64,

    time_s: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl KalmanLocationFilter {
    pub fn new(q_mps: f64) -> Self {
        Self {
            q_mps,
            estimate: None,
        }
    }

    pub fn q_mps(&self) -> f64 {
        self.q_mps
    }

    /// Set the process noise, usually from the current speed over ground.
    pub fn set_q_mps(&mut self, q_mps: f64) {
        self.q_mps = q_mps;
    }

    /// Accuracy of the current estimate, `None` before the first fix.
    ///
    /// Units: meters
    pub fn accuracy_m(&self) -> Option<f64> {
        self.estimate.map(|e| e.variance.sqrt())
    }

    /// Blend a new fix into the estimate and return the filtered fix.
    ///
    /// The returned sample carries the fix's timestamp, the filtered position
    /// and the estimate's accuracy. Speed and course are not touched.
    pub fn process(&mut self, fix: &PositionSample) -> PositionSample {
        let accuracy_m = fix.accuracy_m.max(MIN_ACCURACY_M);
        let measurement_variance = accuracy_m * accuracy_m;

        let est = match self.estimate {
            None => Estimate {
                position: fix.position,
                variance: measurement_variance,
                time_s: fix.time_s,
            },
            Some(mut est) => {
                let dt = fix.time_s - est.time_s;
                if dt > 0.0 {
                    est.variance += dt * self.q_mps * self.q_mps;
                    est.time_s = fix.time_s;
                }

                let k = est.variance / (est.variance + measurement_variance);

                est.position.latitude += k * (fix.position.latitude - est.position.latitude);
                est.position.longitude += k * (fix.position.longitude - est.position.longitude);
                est.variance *= 1.0 - k;

                trace!("Kalman gain {:.4}, variance {:.3} m^2", k, est.variance);
                est
            }
        };

        self.estimate = Some(est);

        PositionSample {
            position: est.position,
            accuracy_m: est.variance.sqrt(),
            time_s: fix.time_s,
            speed_mps: fix.speed_mps,
            heading_deg: fix.heading_deg,
        }
    }

    pub fn reset(&mut self) {
        self.estimate = None;
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
