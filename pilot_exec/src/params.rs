//! # Pilot Parameters
//!
//! This module provides the complete parameter set of the pilot, loaded from a
//! TOML file at startup and replaceable at runtime. Every field has a default
//! so a parameter file only needs to contain the values it changes.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    drift::DriftParams,
    motor::MotorParams,
    nav::GpsParams,
    orient_ctrl, path_ctrl,
    pid::TuneConfig,
    rate_ctrl,
    sensors::SimParams,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// All parameters of the pilot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PilotParams {
    pub gps: GpsParams,
    pub drift: DriftParams,
    pub path: path_ctrl::Params,
    pub orientation: orient_ctrl::Params,
    pub rate: rate_ctrl::Params,
    pub motor: MotorParams,
    pub sim: SimParams,
}

/// Relay auto-tune settings of a stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TuneParams {
    /// Relay step either side of zero, in the stage's output units.
    pub step: f64,

    /// Half width of the hysteresis band, in the stage's input units.
    pub noise_band: f64,

    /// Allowed spread of the oscillation amplitude, as a fraction.
    pub allowed_variance: f64,

    /// Number of extrema after which the noise band is dropped.
    pub disable_noise_band_after: usize,

    /// Extrema needed before the tuner may converge.
    pub cycle_count: usize,

    /// Extrema after which the tuner stops whatever the amplitude spread.
    pub max_cycle_count: usize,

    /// Number of recent extrema used to measure the oscillation.
    pub look_back: usize,

    /// A session running longer than this is cancelled.
    ///
    /// Units: seconds
    pub timeout_s: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Reasons a parameter set can be rejected.
#[derive(Debug, Error)]
pub enum ParamsError {
    #[error("{0} must be greater than zero, found {1}")]
    NotPositive(&'static str, f64),

    #[error("{0} must not be negative, found {1}")]
    Negative(&'static str, f64),

    #[error("{0} must be a finite number, found {1}")]
    NotFinite(&'static str, f64),

    #[error("{name} ({value}) must be at least {min}")]
    CountTooSmall {
        name: &'static str,
        value: usize,
        min: usize,
    },

    #[error("Could not parse the parameters: {0}")]
    InvalidJson(serde_json::Error),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PilotParams {
    /// Check every section of the parameters.
    pub fn validate(&self) -> Result<(), ParamsError> {
        check_positive("gps.min_required_accuracy_m", self.gps.min_required_accuracy_m)?;
        check_positive("gps.kalman_q_mps", self.gps.kalman_q_mps)?;
        check_non_negative("gps.kalman_min_q_mps", self.gps.kalman_min_q_mps)?;

        check_positive("drift.average_window_s", self.drift.average_window_s)?;
        check_non_negative("drift.max_lag_s", self.drift.max_lag_s)?;

        self.path.validate()?;
        self.orientation.validate()?;
        self.rate.validate()?;

        check_positive("motor.send_period_s", self.motor.send_period_s)?;
        check_non_negative("motor.disable_grace_s", self.motor.disable_grace_s)?;

        self.sim.validate()
    }

    /// Parse a parameter set from a JSON value, as carried by a telecommand.
    pub fn from_json(value: serde_json::Value) -> Result<Self, ParamsError> {
        serde_json::from_value(value).map_err(ParamsError::InvalidJson)
    }
}

impl Default for TuneParams {
    fn default() -> Self {
        Self {
            step: 1.0,
            noise_band: 0.5,
            allowed_variance: 0.1,
            disable_noise_band_after: 2,
            cycle_count: 6,
            max_cycle_count: 20,
            look_back: 3,
            timeout_s: 300.0,
        }
    }
}

impl TuneParams {
    pub fn validate(&self, stage: &'static str) -> Result<(), ParamsError> {
        check_positive(stage, self.step)?;
        check_non_negative(stage, self.noise_band)?;
        check_non_negative(stage, self.allowed_variance)?;
        check_positive(stage, self.timeout_s)?;

        if self.look_back < crate::pid::MIN_LOOK_BACK {
            return Err(ParamsError::CountTooSmall {
                name: "look_back",
                value: self.look_back,
                min: crate::pid::MIN_LOOK_BACK,
            });
        }
        if self.cycle_count < self.look_back {
            return Err(ParamsError::CountTooSmall {
                name: "cycle_count",
                value: self.cycle_count,
                min: self.look_back,
            });
        }
        if self.max_cycle_count < self.cycle_count {
            return Err(ParamsError::CountTooSmall {
                name: "max_cycle_count",
                value: self.max_cycle_count,
                min: self.cycle_count,
            });
        }

        Ok(())
    }

    /// Build the configuration of a tuning session driving an error signal to
    /// zero with a symmetric relay.
    pub fn to_config(&self) -> TuneConfig {
        TuneConfig {
            setpoint: 0.0,
            step_high: self.step,
            step_low: -self.step,
            noise_band: self.noise_band,
            disable_noise_band_after: self.disable_noise_band_after,
            cycle_count: self.cycle_count,
            max_cycle_count: self.max_cycle_count,
            look_back: self.look_back,
            allowed_amplitude_variance: self.allowed_variance,
        }
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Reject non-finite and non-positive values.
pub fn check_positive(name: &'static str, value: f64) -> Result<(), ParamsError> {
    if !value.is_finite() {
        return Err(ParamsError::NotFinite(name, value));
    }
    if value <= 0.0 {
        return Err(ParamsError::NotPositive(name, value));
    }
    Ok(())
}

/// Reject non-finite and negative values.
pub fn check_non_negative(name: &'static str, value: f64) -> Result<(), ParamsError> {
    if !value.is_finite() {
        return Err(ParamsError::NotFinite(name, value));
    }
    if value < 0.0 {
        return Err(ParamsError::Negative(name, value));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        PilotParams::default().validate().unwrap();
    }

    #[test]
    fn test_partial_toml() {
        let params: PilotParams = util::params::from_toml_str(
            r#"
            [path]
            arrival_radius_m = 35.0

            [rate.gains]
            k_p = 0.2
            "#,
        )
        .unwrap();

        assert_eq!(params.path.arrival_radius_m, 35.0);
        assert_eq!(params.rate.gains.k_p, 0.2);
        assert_eq!(params.rate.gains.k_i, 0.0);
        assert_eq!(params.gps, GpsParams::default());
        params.validate().unwrap();
    }

    #[test]
    fn test_shipped_params_file() {
        let params: PilotParams =
            util::params::from_toml_str(include_str!("../../params/pilot.toml")).unwrap();
        params.validate().unwrap();
        assert_eq!(params.rate.gains.k_p, 0.2);
        assert_eq!(params.rate.tune, PilotParams::default().rate.tune);
    }

    #[test]
    fn test_rejects_invalid() {
        let mut p = PilotParams::default();
        p.rate.rate_cutoff_hz = 0.0;
        assert!(matches!(p.validate(), Err(ParamsError::NotPositive(_, _))));

        let mut p = PilotParams::default();
        p.orientation.gains.k_p = -1.0;
        assert!(matches!(p.validate(), Err(ParamsError::Negative(_, _))));

        let mut p = PilotParams::default();
        p.path.arrival_radius_m = f64::NAN;
        assert!(matches!(p.validate(), Err(ParamsError::NotFinite(_, _))));

        let mut p = PilotParams::default();
        p.rate.tune.cycle_count = 1;
        assert!(matches!(
            p.validate(),
            Err(ParamsError::CountTooSmall { name: "cycle_count", .. })
        ));
    }

    #[test]
    fn test_from_json() {
        let p = PilotParams::from_json(serde_json::json!({
            "orientation": { "gains": { "k_p": 0.5, "k_i": 0.0, "k_d": 0.1 } }
        }))
        .unwrap();
        assert_eq!(p.orientation.gains.k_d, 0.1);

        assert!(matches!(
            PilotParams::from_json(serde_json::json!({ "rate": 5 })),
            Err(ParamsError::InvalidJson(_))
        ));
    }
}
