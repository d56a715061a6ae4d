//! # Path control module
//!
//! The outer loop of the cascade. Follows a list of waypoints, popping each
//! one on arrival, and produces a desired heading for [`crate::orient_ctrl`]
//! corrected for the drift between the compass and the GPS course.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
mod state;

// ---------------------------------------------------------------------------
// EXPORTS
// ---------------------------------------------------------------------------

pub use params::*;
pub use state::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during PathCtrl operation.
#[derive(Debug, thiserror::Error)]
pub enum PathCtrlError {
    #[error("Position is not finite: {0}, {1}")]
    NonFinitePosition(f64, f64),

    #[error("Cannot enable path following without any waypoints")]
    NoWaypoints,
}
