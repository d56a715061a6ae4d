//! # Sensor samples
//!
//! All timestamps are seconds on a single monotonic time axis chosen by the
//! producer (the executable uses seconds since the start of the session).

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A point on the Earth's surface.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    /// Latitude in degrees, positive north.
    pub latitude: f64,

    /// Longitude in degrees, positive east.
    pub longitude: f64,
}

/// A compass reading.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeadingSample {
    /// Heading in degrees, in the range [0, 360).
    pub heading_deg: f64,

    /// Time of the reading.
    ///
    /// Units: seconds
    pub time_s: f64,
}

/// A GPS fix, optionally augmented with speed and course over ground.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionSample {
    /// Position of the fix
    pub position: LatLon,

    /// One standard deviation of the position error.
    ///
    /// Units: meters
    pub accuracy_m: f64,

    /// Time of the fix.
    ///
    /// Units: seconds
    pub time_s: f64,

    /// Speed over ground, absent until at least two fixes have been accepted.
    ///
    /// Units: meters/second
    pub speed_mps: Option<f64>,

    /// Course over ground in degrees [0, 360), absent until at least two
    /// fixes have been accepted.
    pub heading_deg: Option<f64>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl LatLon {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

impl HeadingSample {
    pub fn new(heading_deg: f64, time_s: f64) -> Self {
        Self { heading_deg, time_s }
    }
}

impl PositionSample {
    /// Create a raw fix with no speed or course information.
    pub fn raw(position: LatLon, accuracy_m: f64, time_s: f64) -> Self {
        Self {
            position,
            accuracy_m,
            time_s,
            speed_mps: None,
            heading_deg: None,
        }
    }
}
