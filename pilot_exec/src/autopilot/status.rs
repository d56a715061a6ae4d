//! Telemetry snapshot and saved gain presets

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use comms_if::{eqpt::LatLon, tc::Stage};

use crate::pid::PidGains;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A titled set of gains for one stage, kept so it can be reapplied later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedGains {
    pub title: String,
    pub stage: Stage,
    pub gains: PidGains,
}

/// Snapshot of the autopilot state for display and logging.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct AutopilotStatus {
    /// Units: seconds
    pub time_s: f64,

    pub path_enabled: bool,
    pub orientation_enabled: bool,
    pub rotation_rate_enabled: bool,

    pub orientation_tuning: bool,
    pub rotation_rate_tuning: bool,

    /// Units: degrees
    pub desired_heading_deg: f64,

    /// Units: degrees/second
    pub desired_rate_dps: f64,

    pub filtered_heading_deg: Option<f64>,
    pub filtered_rate_dps: Option<f64>,

    /// Units: degrees/second
    pub max_rate_dps: f64,

    pub motor_power: f64,
    pub motor_connected: bool,

    pub position: Option<LatLon>,

    /// Units: meters/second
    pub speed_mps: Option<f64>,

    /// Bearing to the current waypoint without drift correction.
    pub heading_to_destination_deg: Option<f64>,

    pub distance_to_waypoint_m: Option<f64>,

    /// Compass heading minus GPS course.
    pub drift_deg: Option<f64>,

    /// Units: seconds
    pub drift_lag_s: Option<f64>,

    pub waypoints_remaining: usize,
    pub path_complete: bool,
}
