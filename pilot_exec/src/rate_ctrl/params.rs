//! Parameters structure for RateCtrl

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

/// Parameters for rotation rate control.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Params {
    // ---- CONTROLLER ----

    /// Gains of the rate PID, output is motor power.
    pub gains: PidGains,

    /// Cutoff of the filter applied to the error before differentiating.
    ///
    /// Units: hertz
    pub derivative_cutoff_hz: f64,

    // ---- RATE ESTIMATION ----

    /// Cutoff of the filter applied to the heading before differentiating it
    /// into a rate.
    ///
    /// Units: hertz
    pub heading_cutoff_hz: f64,

    /// Cutoff of the filter applied to the derived rate.
    ///
    /// Units: hertz
    pub rate_cutoff_hz: f64,

    // ---- LIMITS ----

    /// Largest rotation rate allowed for each knot of speed over ground.
    ///
    /// Units: degrees/second/knot
    pub max_rate_dps_per_kt: f64,

    // ---- TUNING ----

    pub tune: TuneParams,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            gains: PidGains::default(),
            derivative_cutoff_hz: 0.1,
            heading_cutoff_hz: 1.0,
            rate_cutoff_hz: 0.5,
            max_rate_dps_per_kt: 4.0,
            tune: TuneParams {
                step: 1.0,
                noise_band: 1.0,
                ..Default::default()
            },
        }
    }
}

impl Params {
    pub fn validate(&self) -> Result<(), ParamsError> {
        check_non_negative("rate.gains.k_p", self.gains.k_p)?;
        check_non_negative("rate.gains.k_i", self.gains.k_i)?;
        check_non_negative("rate.gains.k_d", self.gains.k_d)?;
        check_positive("rate.derivative_cutoff_hz", self.derivative_cutoff_hz)?;
        check_positive("rate.heading_cutoff_hz", self.heading_cutoff_hz)?;
        check_positive("rate.rate_cutoff_hz", self.rate_cutoff_hz)?;
        check_positive("rate.max_rate_dps_per_kt", self.max_rate_dps_per_kt)?;
        self.tune.validate("rate.tune")
    }
}
