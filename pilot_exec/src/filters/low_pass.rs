//! # Low pass filters
//!
//! Single pole low pass filters for scalar signals, and a heading filter built
//! on top of them which is continuous across the 0/360 degree boundary.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::f64::consts::PI;

use super::{CutoffSource, Filter};
use util::maths::wrap_360;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A first order (RC) low pass filter.
///
/// For consecutive samples the smoothing factor is `dt / (RC + dt)` where
/// `RC = 1 / (2 pi f_c)`. The first sample seeds the output unchanged.
#[derive(Debug)]
pub struct LowPassFilter {
    cutoff: CutoffSource,

    /// Previous (output, time) pair
    prev: Option<(f64, f64)>,
}

/// Low pass filter for angles in degrees.
///
/// The angle is split into its cosine and sine components, each of which is
/// filtered independently, before being recombined with `atan2`. The output is
/// in the range [0, 360).
#[derive(Debug)]
pub struct HeadingFilter {
    cos_filter: LowPassFilter,
    sin_filter: LowPassFilter,
    last_output: Option<f64>,
}

/// A number of identical low pass filters in series, giving a steeper roll
/// off than a single stage.
#[derive(Debug)]
pub struct ChainedFilter {
    stages: Vec<LowPassFilter>,
}

/// A filter which does nothing.
#[derive(Debug, Default)]
pub struct PassThrough {
    last_output: Option<f64>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl LowPassFilter {
    pub fn new<C: Into<CutoffSource>>(cutoff: C) -> Self {
        Self {
            cutoff: cutoff.into(),
            prev: None,
        }
    }

    /// Change the cutoff frequency without losing the filter's history.
    pub fn set_cutoff_hz(&mut self, cutoff_hz: f64) {
        self.cutoff = CutoffSource::Fixed(cutoff_hz);
    }

    pub fn cutoff_hz(&self) -> f64 {
        self.cutoff.get_hz()
    }

    /// Smoothing factor for a step of `dt`.
    fn alpha(&self, dt: f64) -> f64 {
        let cutoff_hz = self.cutoff.get_hz();
        if cutoff_hz <= 0.0 || !cutoff_hz.is_finite() {
            return 0.0;
        }

        let rc = 1.0 / (2.0 * PI * cutoff_hz);
        dt / (rc + dt)
    }
}

impl Filter for LowPassFilter {
    fn process(&mut self, value: f64, time: f64) -> f64 {
        let output = match self.prev {
            None => value,
            Some((prev_output, prev_time)) => {
                let dt = time - prev_time;

                // A sample from the past, or a repeated one, carries no new
                // information about the rate of change.
                if dt <= 0.0 {
                    return prev_output;
                }

                let alpha = self.alpha(dt);
                alpha * value + (1.0 - alpha) * prev_output
            }
        };

        self.prev = Some((output, time));
        output
    }

    fn reset(&mut self) {
        self.prev = None;
    }

    fn last_output(&self) -> Option<f64> {
        self.prev.map(|(o, _)| o)
    }
}

impl HeadingFilter {
    pub fn new(cutoff_hz: f64) -> Self {
        Self {
            cos_filter: LowPassFilter::new(cutoff_hz),
            sin_filter: LowPassFilter::new(cutoff_hz),
            last_output: None,
        }
    }

    pub fn set_cutoff_hz(&mut self, cutoff_hz: f64) {
        self.cos_filter.set_cutoff_hz(cutoff_hz);
        self.sin_filter.set_cutoff_hz(cutoff_hz);
    }
}

impl Filter for HeadingFilter {
    fn process(&mut self, value: f64, time: f64) -> f64 {
        let rad = value.to_radians();

        let c = self.cos_filter.process(rad.cos(), time);
        let s = self.sin_filter.process(rad.sin(), time);

        let output = wrap_360(s.atan2(c).to_degrees());
        self.last_output = Some(output);
        output
    }

    fn reset(&mut self) {
        self.cos_filter.reset();
        self.sin_filter.reset();
        self.last_output = None;
    }

    fn last_output(&self) -> Option<f64> {
        self.last_output
    }
}

impl ChainedFilter {
    /// Create a new chain of `order` filters with the same cutoff. An order of
    /// zero is treated as one.
    pub fn new(cutoff_hz: f64, order: usize) -> Self {
        Self {
            stages: (0..order.max(1))
                .map(|_| LowPassFilter::new(cutoff_hz))
                .collect(),
        }
    }

    pub fn order(&self) -> usize {
        self.stages.len()
    }
}

impl Filter for ChainedFilter {
    fn process(&mut self, value: f64, time: f64) -> f64 {
        self.stages
            .iter_mut()
            .fold(value, |v, stage| stage.process(v, time))
    }

    fn reset(&mut self) {
        self.stages.iter_mut().for_each(|s| s.reset());
    }

    fn last_output(&self) -> Option<f64> {
        self.stages.last().and_then(|s| s.last_output())
    }
}

impl Filter for PassThrough {
    fn process(&mut self, value: f64, _time: f64) -> f64 {
        self.last_output = Some(value);
        value
    }

    fn reset(&mut self) {
        self.last_output = None;
    }

    fn last_output(&self) -> Option<f64> {
        self.last_output
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    };

    #[test]
    fn test_first_sample_seeds() {
        let mut f = LowPassFilter::new(0.5);
        assert_eq!(f.last_output(), None);
        assert_eq!(f.process(12.0, 0.0), 12.0);
        assert_eq!(f.last_output(), Some(12.0));
    }

    #[test]
    fn test_alpha() {
        // With dt == RC the smoothing factor is exactly one half
        let cutoff_hz = 1.0 / (2.0 * PI);
        let mut f = LowPassFilter::new(cutoff_hz);
        f.process(0.0, 0.0);
        assert_abs_diff_eq!(f.process(10.0, 1.0), 5.0, epsilon = 1e-12);

        // Repeated timestamps don't move the output
        assert_abs_diff_eq!(f.process(100.0, 1.0), 5.0, epsilon = 1e-12);
    }

    #[test]
    fn test_step_response_converges() {
        let mut f = LowPassFilter::new(1.0);
        f.process(0.0, 0.0);

        let mut out = 0.0;
        for i in 1..200 {
            out = f.process(1.0, i as f64 * 0.1);
        }
        assert_abs_diff_eq!(out, 1.0, epsilon = 1e-6);

        f.reset();
        assert_eq!(f.process(-3.0, 50.0), -3.0);
    }

    #[test]
    fn test_dynamic_cutoff() {
        let cutoff = Arc::new(AtomicU64::new(0f64.to_bits()));
        let c = cutoff.clone();
        let mut f = LowPassFilter::new(CutoffSource::Dynamic(Box::new(move || {
            f64::from_bits(c.load(Ordering::Relaxed))
        })));

        // A zero cutoff freezes the output
        f.process(1.0, 0.0);
        assert_eq!(f.process(5.0, 1.0), 1.0);

        // Raising the cutoff lets the new value through
        cutoff.store(1000f64.to_bits(), Ordering::Relaxed);
        assert_abs_diff_eq!(f.process(5.0, 2.0), 5.0, epsilon = 1e-3);
    }

    #[test]
    fn test_heading_converges_to_constant() {
        for target in [0.0, 45.0, 179.0, 270.0, 359.5].iter() {
            let mut f = HeadingFilter::new(0.5);
            f.process(wrap_360(target + 120.0), 0.0);

            let mut out = 0.0;
            for i in 1..400 {
                out = f.process(*target, i as f64 * 0.1);
            }

            let err = util::maths::wrap_180(out - target).abs();
            assert!(err < 1e-3, "target {} gave {}", target, out);
        }
    }

    #[test]
    fn test_heading_wraparound() {
        let mut f = HeadingFilter::new(0.5);

        for i in 0..200 {
            let heading = if i % 2 == 0 { 359.0 } else { 1.0 };
            let out = f.process(heading, i as f64 * 0.1);

            assert!(out >= 0.0 && out < 360.0);
            assert!(
                util::maths::wrap_180(out).abs() < 2.0,
                "Output {} is far from north",
                out
            );
        }
    }

    #[test]
    fn test_chained_is_smoother() {
        let mut single = LowPassFilter::new(0.5);
        let mut chained = ChainedFilter::new(0.5, 3);
        assert_eq!(chained.order(), 3);

        single.process(0.0, 0.0);
        chained.process(0.0, 0.0);

        let s = single.process(1.0, 0.1);
        let c = chained.process(1.0, 0.1);
        assert!(c < s);
        assert_eq!(chained.last_output(), Some(c));
    }

    #[test]
    fn test_pass_through() {
        let mut f = PassThrough::default();
        assert_eq!(f.process(3.0, 0.0), 3.0);
        assert_eq!(f.process(-7.0, 0.0), -7.0);
        assert_eq!(f.last_output(), Some(-7.0));
    }
}
