//! # Rotation rate control module
//!
//! The inner loop of the cascade. The boat's rotation rate isn't sensed
//! directly, it's derived from successive filtered compass headings, and a PID
//! stage turns the error between the derived and desired rates into a tiller
//! motor power in [-1, 1].
//!
//! Positive rates are clockwise, positive motor power turns the boat
//! counterclockwise.

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
// CONSTANTS
// ---------------------------------------------------------------------------

/// Largest magnitude of the motor power output.
pub const MAX_POWER: f64 = 1.0;

/// Speed used to scale the rate limit when the boat is slower than this or
/// its speed is unknown.
///
/// Units: knots
pub const REFERENCE_SPEED_KTS: f64 = 1.0;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during RateCtrl operation.
#[derive(Debug, thiserror::Error)]
pub enum RateCtrlError {
    #[error("Heading sample is not a finite number: {0}")]
    NonFiniteHeading(f64),

    #[error("Heading sample time is not a finite number: {0}")]
    NonFiniteTime(f64),
}
