//! Rolling drift estimator

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::collections::VecDeque;

use log::trace;
use serde::{Deserialize, Serialize};

use super::{estimate_lag, LagEstimate};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Hard limit on the number of retained sample pairs, whatever the window.
pub const MAX_RETAINED_SAMPLES: usize = 4096;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters of the drift estimator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriftParams {
    /// Length of the rolling window of samples used for the estimate.
    ///
    /// Units: seconds
    pub average_window_s: f64,

    /// Largest lag between the compass and GPS course searched for.
    ///
    /// Units: seconds
    pub max_lag_s: f64,
}

/// Estimates the offset between the compass heading and the GPS course over
/// ground over a rolling time window.
#[derive(Debug, Clone)]
pub struct DriftEstimator {
    params: DriftParams,

    /// Sample times, compass and GPS angles, kept in lockstep.
    times_s: VecDeque<f64>,
    compass_deg: VecDeque<f64>,
    gps_deg: VecDeque<f64>,
}

/// A drift estimate in physical units.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct DriftEstimate {
    /// Compass heading minus GPS course, in (-180, 180].
    pub drift_deg: f64,

    /// Lag of the compass behind the GPS course.
    ///
    /// Units: seconds
    pub lag_s: f64,

    /// The raw sample-domain estimate
    pub raw: LagEstimate,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for DriftParams {
    fn default() -> Self {
        Self {
            average_window_s: 6.0 * 60.0,
            max_lag_s: 30.0,
        }
    }
}

impl DriftEstimator {
    pub fn new(params: &DriftParams) -> Self {
        Self {
            params: params.clone(),
            times_s: VecDeque::new(),
            compass_deg: VecDeque::new(),
            gps_deg: VecDeque::new(),
        }
    }

    pub fn set_params(&mut self, params: &DriftParams) {
        self.params = params.clone();
    }

    /// Add a simultaneous pair of compass heading and GPS course readings.
    pub fn add(&mut self, time_s: f64, compass_deg: f64, gps_deg: f64) {
        // Out of order samples would break the lag search
        if let Some(last) = self.times_s.back() {
            if time_s < *last {
                trace!("Dropping out of order drift sample at {:.3} s", time_s);
                return;
            }
        }

        self.times_s.push_back(time_s);
        self.compass_deg.push_back(compass_deg);
        self.gps_deg.push_back(gps_deg);

        let oldest_allowed_s = time_s - self.params.average_window_s;
        while self.times_s.len() > MAX_RETAINED_SAMPLES
            || self.times_s.front().map_or(false, |t| *t < oldest_allowed_s)
        {
            self.times_s.pop_front();
            self.compass_deg.pop_front();
            self.gps_deg.pop_front();
        }
    }

    /// Number of sample pairs currently retained.
    pub fn len(&self) -> usize {
        self.times_s.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times_s.is_empty()
    }

    /// Calculate the current drift estimate, `None` if no samples are held.
    pub fn estimate(&self) -> Option<DriftEstimate> {
        let interval_s = self.mean_interval_s();

        let max_lag = match interval_s {
            Some(dt) if dt > 0.0 => (self.params.max_lag_s / dt).ceil() as usize,
            _ => 0,
        };

        let compass: Vec<f64> = self.compass_deg.iter().copied().collect();
        let gps: Vec<f64> = self.gps_deg.iter().copied().collect();

        let raw = estimate_lag(&compass, &gps, max_lag)?;

        Some(DriftEstimate {
            drift_deg: raw.mean_delta_deg,
            lag_s: raw.lag as f64 * interval_s.unwrap_or(0.0),
            raw,
        })
    }

    pub fn clear(&mut self) {
        self.times_s.clear();
        self.compass_deg.clear();
        self.gps_deg.clear();
    }

    /// Mean time between retained samples.
    fn mean_interval_s(&self) -> Option<f64> {
        let n = self.times_s.len();
        if n < 2 {
            return None;
        }

        Some((self.times_s.back()? - self.times_s.front()?) / (n - 1) as f64)
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
