//! # Navigation module
//!
//! Geodesy and the GPS processing chain which turns raw fixes into a smoothed
//! position with speed and course over ground.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod geo;
pub mod gps_filter;
pub mod loc_history;

// ---------------------------------------------------------------------------
// EXPORTS
// ---------------------------------------------------------------------------

pub use gps_filter::{GpsFilter, GpsParams};
pub use loc_history::{FixOutcome, LocationHistoryTracker};
