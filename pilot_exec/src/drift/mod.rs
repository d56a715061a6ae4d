//! # Drift estimation module
//!
//! The compass and the GPS course over ground disagree by a slowly varying
//! offset (magnetic variation, deviation, leeway), and the GPS course lags the
//! compass by an unknown time. This module finds that lag by cross
//! correlating the two signals, then measures the average offset between them
//! once they are aligned.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod angle_lag;
mod estimator;

// ---------------------------------------------------------------------------
// EXPORTS
// ---------------------------------------------------------------------------

pub use angle_lag::*;
pub use estimator::*;
