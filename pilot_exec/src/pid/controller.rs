//! # PID controller
//!
//! The derivative term acts on a low pass filtered copy of the error, and the
//! integral is frozen while the output is saturated in the direction the
//! error is pushing it.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::debug;
use serde::{Deserialize, Serialize};

use crate::filters::{Filter, LowPassFilter};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// PID gains.
#[derive(Debug, Default, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PidGains {
    /// Proportional gain
    pub k_p: f64,

    /// Integral gain
    pub k_i: f64,

    /// Derivative gain
    pub k_d: f64,
}

/// A PID controller.
#[derive(Debug)]
pub struct PidController {
    gains: PidGains,

    /// Magnitude of output at which the controller considers itself
    /// saturated.
    saturation_limit: f64,

    /// Filter applied to the error before differentiating
    derivative_filter: LowPassFilter,

    /// Time of the previous update
    prev_time_s: Option<f64>,

    /// Previous filtered error
    prev_error_filt: Option<f64>,

    /// The previous output of the controller
    prev_output: f64,

    /// The integral accumulation
    integral: f64,

    saturation_reached: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PidGains {
    pub fn new(k_p: f64, k_i: f64, k_d: f64) -> Self {
        Self { k_p, k_i, k_d }
    }

    /// Round each gain to the given number of significant figures.
    pub fn to_precision(&self, sig_figs: i32) -> Self {
        Self {
            k_p: round_sig_figs(self.k_p, sig_figs),
            k_i: round_sig_figs(self.k_i, sig_figs),
            k_d: round_sig_figs(self.k_d, sig_figs),
        }
    }
}

impl PidController {
    /// Create a new controller with the given gains, derivative filter cutoff
    /// and saturation limit.
    pub fn new(gains: PidGains, derivative_cutoff_hz: f64, saturation_limit: f64) -> Self {
        Self {
            gains,
            saturation_limit,
            derivative_filter: LowPassFilter::new(derivative_cutoff_hz),
            prev_time_s: None,
            prev_error_filt: None,
            prev_output: 0.0,
            integral: 0.0,
            saturation_reached: false,
        }
    }

    pub fn gains(&self) -> PidGains {
        self.gains
    }

    /// Change the gains.
    ///
    /// If any gain differs from the current ones the integral and derivative
    /// history is cleared to avoid a kick in the output.
    pub fn set_gains(&mut self, gains: PidGains) {
        if gains != self.gains {
            debug!("PID gains changed from {:?} to {:?}", self.gains, gains);
            self.gains = gains;
            self.reset();
        }
    }

    pub fn set_derivative_cutoff_hz(&mut self, cutoff_hz: f64) {
        self.derivative_filter.set_cutoff_hz(cutoff_hz);
    }

    pub fn set_saturation_limit(&mut self, limit: f64) {
        self.saturation_limit = limit;
    }

    /// True if the last output reached the saturation limit.
    pub fn saturation_reached(&self) -> bool {
        self.saturation_reached
    }

    pub fn integral(&self) -> f64 {
        self.integral
    }

    /// Clear the integral, derivative and output history.
    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.prev_time_s = None;
        self.prev_error_filt = None;
        self.prev_output = 0.0;
        self.saturation_reached = false;
        self.derivative_filter.reset();
    }

    /// Get the value of the controller for the given error at the given time.
    ///
    /// The output is not limited, the caller is responsible for saturating it.
    pub fn update(&mut self, error: f64, time_s: f64) -> f64 {
        // Calculate dt, there's none on the first update or if time hasn't
        // moved on.
        let dt = self
            .prev_time_s
            .map(|t0| time_s - t0)
            .filter(|dt| *dt > 0.0);

        let error_filt = self.derivative_filter.process(error, time_s);

        // Accumulate the integral term unless the output is already pinned in
        // the direction the error is pushing it.
        let windup = self.saturation_reached && error * self.prev_output > 0.0;
        if let (Some(dt), false) = (dt, windup) {
            self.integral += error * dt;
        }

        let deriv = match (dt, self.prev_error_filt) {
            (Some(dt), Some(e0)) => (error_filt - e0) / dt,
            _ => 0.0,
        };

        let out = self.gains.k_p * error + self.gains.k_i * self.integral + self.gains.k_d * deriv;

        if dt.is_some() || self.prev_time_s.is_none() {
            self.prev_time_s = Some(time_s);
            self.prev_error_filt = Some(error_filt);
        }
        self.prev_output = out;
        self.saturation_reached = out.abs() >= self.saturation_limit;

        out
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Round `value` to `sig_figs` significant figures.
pub fn round_sig_figs(value: f64, sig_figs: i32) -> f64 {
    if value == 0.0 || !value.is_finite() {
        return value;
    }

    let magnitude = value.abs().log10().floor() as i32;
    let digits = sig_figs - 1 - magnitude;

    // Keep the scale factor an exact integer in both directions
    if digits >= 0 {
        let scale = 10f64.powi(digits);
        (value * scale).round() / scale
    } else {
        let scale = 10f64.powi(-digits);
        (value / scale).round() * scale
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_proportional_only() {
        let mut pid = PidController::new(PidGains::new(0.5, 0.0, 0.0), 1.0, 1.0);
        assert_relative_eq!(pid.update(10.0, 0.0), 5.0);
        assert_relative_eq!(pid.update(-4.0, 0.1), -2.0);
        assert!(pid.saturation_reached());

        assert_relative_eq!(pid.update(1.0, 0.2), 0.5);
        assert!(!pid.saturation_reached());
    }

    #[test]
    fn test_first_update_has_no_integral_or_derivative() {
        let mut pid = PidController::new(PidGains::new(0.0, 1.0, 1.0), 1.0, 100.0);
        assert_eq!(pid.update(3.0, 7.0), 0.0);
        assert_eq!(pid.integral(), 0.0);

        // One second later the integral holds one second of error
        pid.update(3.0, 8.0);
        assert_relative_eq!(pid.integral(), 3.0);
    }

    #[test]
    fn test_anti_windup_bounds_integral() {
        let mut pid = PidController::new(PidGains::new(1.0, 1.0, 0.0), 1.0, 1.0);

        for i in 0..10_000 {
            let out = pid.update(5.0, i as f64 * 0.1);
            assert!(out >= 5.0);
        }

        // Saturation is flagged on the very first tick so nothing accumulates
        assert!(pid.saturation_reached());
        assert!(pid.integral().abs() <= 0.5 + 1e-9, "integral was {}", pid.integral());

        // An error in the opposite direction unwinds straight away
        pid.update(-5.0, 1000.1);
        assert!(pid.integral() < 0.5);
    }

    #[test]
    fn test_gain_change_resets_history() {
        let mut pid = PidController::new(PidGains::new(0.0, 1.0, 0.0), 1.0, 100.0);
        pid.update(1.0, 0.0);
        pid.update(1.0, 1.0);
        assert_relative_eq!(pid.integral(), 1.0);

        // Same gains, no reset
        pid.set_gains(PidGains::new(0.0, 1.0, 0.0));
        assert_relative_eq!(pid.integral(), 1.0);

        pid.set_gains(PidGains::new(0.0, 2.0, 0.0));
        assert_eq!(pid.integral(), 0.0);
    }

    #[test]
    fn test_derivative_is_filtered() {
        let mut raw = PidController::new(PidGains::new(0.0, 0.0, 1.0), 1000.0, 100.0);
        let mut filt = PidController::new(PidGains::new(0.0, 0.0, 1.0), 0.1, 100.0);

        raw.update(0.0, 0.0);
        filt.update(0.0, 0.0);

        let d_raw = raw.update(1.0, 0.1);
        let d_filt = filt.update(1.0, 0.1);

        assert!(d_raw > 9.0);
        assert!(d_filt > 0.0 && d_filt < d_raw / 5.0);
    }

    #[test]
    fn test_round_sig_figs() {
        assert_relative_eq!(round_sig_figs(0.0123456, 4), 0.01235);
        assert_relative_eq!(round_sig_figs(-1234.56, 4), -1235.0);
        assert_eq!(round_sig_figs(0.0, 4), 0.0);

        let g = PidGains::new(1.23456, 0.000987654, 98765.4).to_precision(4);
        assert_relative_eq!(g.k_p, 1.235);
        assert_relative_eq!(g.k_i, 0.0009877);
        assert_relative_eq!(g.k_d, 98770.0);
    }
}
