//! # Orientation control module
//!
//! The middle loop of the cascade, turning the error between the filtered
//! compass heading and the desired heading into a desired rotation rate for
//! [`crate::rate_ctrl`].

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

/// Possible errors that can occur during OrientCtrl operation.
#[derive(Debug, thiserror::Error)]
pub enum OrientCtrlError {
    #[error("Heading sample is not a finite number: {0}")]
    NonFiniteHeading(f64),

    #[error("The rate limit must be positive, found {0}")]
    InvalidRateLimit(f64),
}
