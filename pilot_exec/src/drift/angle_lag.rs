//! Lag and offset between two angular signals

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use ordered_float::NotNan;
use serde::Serialize;

use crate::nav::geo;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Best fit alignment of two angular signals.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct LagEstimate {
    /// Lag of signal `a` behind signal `b` in samples. Positive means `a[i]`
    /// lines up with `b[i - lag]`.
    pub lag: i64,

    /// Circular mean of `a - b` over the aligned samples, in (-180, 180].
    pub mean_delta_deg: f64,

    /// Mean squared error of the sine transformed signals at `lag`.
    pub mse: f64,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Find the lag between `a` and `b` (angles in degrees) which minimises the
/// mean squared error between `sin(a)` and `sin(b)`, then compute the
/// circular mean of `a - b` at that lag.
///
/// Lags in `[-max_lag, max_lag]` are searched, clamped so that at least one
/// sample overlaps. Ties go to the most negative lag. Returns `None` if
/// either signal is empty.
pub fn estimate_lag(a_deg: &[f64], b_deg: &[f64], max_lag: usize) -> Option<LagEstimate> {
    let n = a_deg.len().min(b_deg.len());
    if n == 0 {
        return None;
    }

    let a_deg = &a_deg[..n];
    let b_deg = &b_deg[..n];
    let a_sin: Vec<f64> = a_deg.iter().map(|a| a.to_radians().sin()).collect();
    let b_sin: Vec<f64> = b_deg.iter().map(|b| b.to_radians().sin()).collect();

    let max_lag = max_lag.min(n - 1) as i64;

    let (lag, mse) = (-max_lag..=max_lag)
        .filter_map(|lag| {
            let (a, b) = aligned(&a_sin, &b_sin, lag);
            let mse = a
                .iter()
                .zip(b.iter())
                .map(|(x, y)| (x - y).powi(2))
                .sum::<f64>()
                / a.len() as f64;

            NotNan::new(mse).ok().map(|m| (lag, m))
        })
        .min_by_key(|(_, mse)| *mse)?;

    let (a, b) = aligned(a_deg, b_deg, lag);
    let deltas: Vec<f64> = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| geo::normalize_delta(x - y))
        .collect();

    Some(LagEstimate {
        lag,
        mean_delta_deg: geo::circular_mean(&deltas)?,
        mse: mse.into_inner(),
    })
}

/// The overlapping parts of `a` and `b` when `a` lags `b` by `lag` samples.
///
/// `a` and `b` must be the same length, and `|lag|` less than that length.
fn aligned<'a>(a: &'a [f64], b: &'a [f64], lag: i64) -> (&'a [f64], &'a [f64]) {
    let n = a.len();
    let abs_lag = lag.abs() as usize;

    if lag >= 0 {
        (&a[abs_lag..], &b[..n - abs_lag])
    } else {
        (&a[..n - abs_lag], &b[abs_lag..])
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
