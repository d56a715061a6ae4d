//! # PID module
//!
//! A generic PID controller with anti-windup and a filtered derivative, and a
//! relay feedback auto-tuner which derives PID gains experimentally.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod controller;
pub mod stage;
pub mod tuner;

// ---------------------------------------------------------------------------
// EXPORTS
// ---------------------------------------------------------------------------

pub use controller::*;
pub use stage::*;
pub use tuner::*;
