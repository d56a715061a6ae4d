//! # Signal filters
//!
//! Filters used to condition the noisy sensor streams before they are used by
//! the control stages. All filters take a value and the "time" at which it was
//! sampled. The time axis is whatever monotonic quantity the caller chooses,
//! usually seconds but cumulative distance travelled works just as well.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod kalman;
pub mod low_pass;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::fmt;

pub use kalman::KalmanLocationFilter;
pub use low_pass::*;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A causal single-input filter.
pub trait Filter {
    /// Feed a new sample into the filter and get the filtered value.
    fn process(&mut self, value: f64, time: f64) -> f64;

    /// Forget all history, the next sample will seed the filter again.
    fn reset(&mut self);

    /// The most recent output, or `None` if no sample has been processed yet.
    fn last_output(&self) -> Option<f64>;
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Where a filter gets its cutoff frequency from.
pub enum CutoffSource {
    /// A fixed cutoff frequency.
    ///
    /// Units: hertz
    Fixed(f64),

    /// A cutoff that is looked up on every sample, allowing it to follow some
    /// live quantity.
    Dynamic(Box<dyn Fn() -> f64 + Send>),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl CutoffSource {
    /// Get the current cutoff frequency in hertz.
    pub fn get_hz(&self) -> f64 {
        match self {
            CutoffSource::Fixed(f) => *f,
            CutoffSource::Dynamic(func) => func(),
        }
    }
}

impl From<f64> for CutoffSource {
    fn from(cutoff_hz: f64) -> Self {
        CutoffSource::Fixed(cutoff_hz)
    }
}

impl fmt::Debug for CutoffSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CutoffSource::Fixed(hz) => write!(f, "Fixed({} Hz)", hz),
            CutoffSource::Dynamic(_) => write!(f, "Dynamic({} Hz)", self.get_hz()),
        }
    }
}
