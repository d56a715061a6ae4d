//! # Communications interface crate.
//!
//! Provides the boundary types shared between the pilot core and its
//! collaborators: sensor samples coming in, motor demands going out, and the
//! telecommands used to drive the pilot.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

pub mod tc;

/// Sample and demand definitions for equipment (compass, GPS, tiller motor)
pub mod eqpt;
