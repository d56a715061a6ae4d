//! # Tiller pilot library.
//!
//! The control core of the tiller autopilot, shared by the `pilot_exec`
//! executable and the integration tests.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

/// Autopilot - the cascade of control stages and the commands which drive it
pub mod autopilot;

/// Data store - global state of the executable
pub mod data_store;

/// Drift estimator - offset and lag between the compass and the GPS course
pub mod drift;

/// Signal filters
pub mod filters;

/// Motor output - latest tiller command and its delivery
pub mod motor;

/// Navigation - geodesy, GPS filtering and location history
pub mod nav;

/// Orientation control - turns a desired heading into a desired rotation rate
pub mod orient_ctrl;

/// Pilot parameters
pub mod params;

/// Path control - steers towards each waypoint in turn
pub mod path_ctrl;

/// PID controller and relay auto-tuner
pub mod pid;

/// Rotation rate control - turns a desired rotation rate into motor power
pub mod rate_ctrl;

/// Sensor sources - simulated, replayed or real compass and GPS samples
pub mod sensors;
