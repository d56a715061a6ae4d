//! # Autopilot module
//!
//! The cascade of path, orientation and rotation rate control, driven by
//! compass and GPS samples as they arrive. [`Autopilot`] owns every stage and
//! the GPS filter, routes the output of each stage into the setpoint of the
//! next, and exposes the latest motor command for a sender to deliver.
//!
//! Per compass sample the stages run in a fixed order: orientation first, then
//! rotation rate using the desired rate latched on the previous sample, after
//! which the new orientation output becomes the desired rate. Path control
//! runs on each accepted GPS fix.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod manual;
mod pilot;
mod status;

// ---------------------------------------------------------------------------
// EXPORTS
// ---------------------------------------------------------------------------

pub use pilot::*;
pub use status::*;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::tc::Stage;

use crate::params::ParamsError;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors returned by autopilot commands.
#[derive(Debug, thiserror::Error)]
pub enum AutopilotError {
    #[error("Cannot enable path following without any waypoints")]
    NoWaypoints,

    #[error("The {0} stage cannot be tuned")]
    CannotTune(Stage),

    #[error("The {0} stage is already being tuned")]
    AlreadyTuning(Stage),

    #[error("No compass heading has been received yet")]
    NoHeading,

    #[error("No saved gains titled \"{0}\"")]
    UnknownSavedGains(String),

    #[error("Invalid parameters: {0}")]
    InvalidParams(#[from] ParamsError),
}
