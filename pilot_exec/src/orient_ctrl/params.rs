//! Parameters structure for OrientCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::{
    params::{check_non_negative, check_positive, ParamsError, TuneParams},
    pid::PidGains,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for orientation control.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Params {
    /// Gains of the orientation PID, output is rotation rate in
    /// degrees/second.
    pub gains: PidGains,

    /// Cutoff of the filter applied to the error before differentiating.
    ///
    /// Units: hertz
    pub derivative_cutoff_hz: f64,

    /// Cutoff of the compass heading filter.
    ///
    /// Units: hertz
    pub heading_cutoff_hz: f64,

    pub tune: TuneParams,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            gains: PidGains::default(),
            derivative_cutoff_hz: 1.0,
            heading_cutoff_hz: 1.0,
            tune: TuneParams {
                step: 1.0,
                noise_band: 0.5,
                ..Default::default()
            },
        }
    }
}

impl Params {
    pub fn validate(&self) -> Result<(), ParamsError> {
        check_non_negative("orientation.gains.k_p", self.gains.k_p)?;
        check_non_negative("orientation.gains.k_i", self.gains.k_i)?;
        check_non_negative("orientation.gains.k_d", self.gains.k_d)?;
        check_positive("orientation.derivative_cutoff_hz", self.derivative_cutoff_hz)?;
        check_positive("orientation.heading_cutoff_hz", self.heading_cutoff_hz)?;
        self.tune.validate("orientation.tune")
    }
}
