//! # Sensor sources
//!
//! The pilot doesn't talk to sensors itself, it polls a [`SensorSource`] once
//! per cycle for the compass and GPS samples which arrived since the last
//! poll. A [`SourceProxy`] switches between a simulated boat and a real (or
//! replayed) source at runtime.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod proxy;
mod replay;
#[cfg(feature = "sim")]
mod sim;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use comms_if::eqpt::{HeadingSample, PositionSample};

use crate::params::{check_non_negative, check_positive, ParamsError};

// ---------------------------------------------------------------------------
// EXPORTS
// ---------------------------------------------------------------------------

pub use proxy::*;
pub use replay::*;
#[cfg(feature = "sim")]
pub use sim::*;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters of the simulated boat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimParams {
    /// Constant speed through the water.
    ///
    /// Units: knots
    pub speed_kts: f64,

    /// Offset of the compass from the true heading.
    ///
    /// Units: degrees
    pub compass_drift_deg: f64,

    /// Amplitude of the compass noise.
    ///
    /// Units: degrees
    pub compass_noise_deg: f64,

    /// Amplitude of the GPS position noise.
    ///
    /// Units: meters
    pub gps_noise_m: f64,

    /// Accuracy reported with each GPS fix.
    ///
    /// Units: meters
    pub gps_accuracy_m: f64,

    /// Units: seconds
    pub compass_period_s: f64,

    /// Units: seconds
    pub gps_period_s: f64,

    /// Tiller slew rate at full motor power.
    ///
    /// Units: degrees/second
    pub tiller_rate_dps: f64,

    /// Units: degrees
    pub max_tiller_deg: f64,

    /// Rotation rate of the boat per degree of tiller per knot of speed.
    ///
    /// Units: (degrees/second)/(degree knot)
    pub turn_rate_gain: f64,

    pub start_latitude: f64,
    pub start_longitude: f64,

    /// True heading at the start of the simulation.
    ///
    /// Units: degrees
    pub start_heading_deg: f64,

    /// Seed of the noise generator
    pub seed: u32,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// A sample produced by a sensor source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SensorEvent {
    Heading(HeadingSample),

    /// A GPS reading, `None` if the receiver has no fix.
    Position(Option<PositionSample>),
}

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Provider of compass and GPS samples.
pub trait SensorSource {
    /// Get all samples produced up to `now_s`, oldest first.
    fn poll(&mut self, now_s: f64) -> Vec<SensorEvent>;

    /// Restart the source, dropping any buffered samples.
    fn reset(&mut self);

    fn name(&self) -> &'static str;
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for SimParams {
    fn default() -> Self {
        Self {
            speed_kts: 3.0,
            compass_drift_deg: 30.0,
            compass_noise_deg: 2.0,
            gps_noise_m: 1.5,
            gps_accuracy_m: 3.0,
            compass_period_s: 0.1,
            gps_period_s: 1.0,
            tiller_rate_dps: 20.0,
            max_tiller_deg: 25.0,
            turn_rate_gain: 0.1,
            start_latitude: 50.8,
            start_longitude: -1.3,
            start_heading_deg: 0.0,
            seed: 0,
        }
    }
}

impl SimParams {
    pub fn validate(&self) -> Result<(), ParamsError> {
        check_non_negative("sim.speed_kts", self.speed_kts)?;
        check_non_negative("sim.compass_noise_deg", self.compass_noise_deg)?;
        check_non_negative("sim.gps_noise_m", self.gps_noise_m)?;
        check_positive("sim.gps_accuracy_m", self.gps_accuracy_m)?;
        check_positive("sim.compass_period_s", self.compass_period_s)?;
        check_positive("sim.gps_period_s", self.gps_period_s)?;
        check_positive("sim.tiller_rate_dps", self.tiller_rate_dps)?;
        check_positive("sim.max_tiller_deg", self.max_tiller_deg)?;
        check_positive("sim.turn_rate_gain", self.turn_rate_gain)
    }
}

/// A source which never produces anything, used when no real sensors are
/// available.
#[derive(Debug, Default)]
pub struct NullSource;

impl SensorSource for NullSource {
    fn poll(&mut self, _now_s: f64) -> Vec<SensorEvent> {
        Vec::new()
    }

    fn reset(&mut self) {}

    fn name(&self) -> &'static str {
        "none"
    }
}
