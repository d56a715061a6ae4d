//! Parameters structure for PathCtrl

use serde::{Deserialize, Serialize};

use crate::params::{check_positive, ParamsError};

/// Parameters for path control.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Params {
    /// A waypoint closer than this is considered reached.
    ///
    /// Units: meters
    pub arrival_radius_m: f64,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            arrival_radius_m: 20.0,
        }
    }
}

impl Params {
    pub fn validate(&self) -> Result<(), ParamsError> {
        check_positive("path.arrival_radius_m", self.arrival_radius_m)
    }
}
