//! # Equipment interfaces

pub mod motor;
pub mod sensors;

pub use motor::*;
pub use sensors::*;
