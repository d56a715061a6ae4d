//! # Relay feedback auto-tuner
//!
//! While running, the tuner drives the plant with a bang-bang signal: the high
//! step while the measured value is below the setpoint and the low step
//! otherwise. This makes the plant oscillate about the setpoint. Once enough
//! extrema of the oscillation have been seen the ultimate period `Tu` and the
//! process amplitude `a` are measured, giving the ultimate gain
//! `Ku = 4b / (pi a)` for a relay amplitude `b`. A family of Ziegler-Nichols
//! style gain sets is derived from `Ku` and `Tu`.
//!
//! The tuner is a state machine:
//!
//! ```text
//! Running --(enough consistent extrema)--> Converged(result)
//!    \-----(cancel)----------------------> Cancelled
//! ```
//!
//! Both final states are terminal, a new tuner must be created to try again.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::f64::consts::PI;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::PidGains;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Smallest number of extrema which can be used to measure the oscillation.
pub const MIN_LOOK_BACK: usize = 2;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Configuration of a tuning session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TuneConfig {
    /// The value the plant is made to oscillate about.
    pub setpoint: f64,

    /// Command issued while the value is below the setpoint.
    pub step_high: f64,

    /// Command issued while the value is above the setpoint.
    pub step_low: f64,

    /// Half width of the hysteresis band around the setpoint. Zero disables
    /// hysteresis.
    pub noise_band: f64,

    /// Number of extrema after which the noise band is dropped.
    pub disable_noise_band_after: usize,

    /// Extrema needed before the tuner considers converging.
    pub cycle_count: usize,

    /// Extrema after which the tuner converges whatever the amplitude
    /// consistency.
    pub max_cycle_count: usize,

    /// Number of most recent extrema used to measure the oscillation.
    pub look_back: usize,

    /// Allowed spread of the half cycle amplitudes as a fraction of their
    /// mean, e.g. 0.1 for 10%.
    pub allowed_amplitude_variance: f64,
}

/// A sample of the process value.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub time_s: f64,
    pub value: f64,
}

/// Incremental local extrema detector.
///
/// A point is an extremum if it is strictly above or below both neighbours.
/// For a run of equal values (a plateau) the extremum is placed at the middle
/// of the run, provided the values either side of the run are both above or
/// both below it.
#[derive(Debug, Clone, Default)]
pub struct ExtremaDetector {
    points: Vec<Point>,

    /// Index of the first point of the current plateau
    plateau_start: Option<usize>,

    extrema: Vec<Point>,
}

/// Ultimate gain and period measured from the oscillation.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayMeasurement {
    /// Ultimate gain
    pub ku: f64,

    /// Ultimate period
    ///
    /// Units: seconds
    pub tu_s: f64,

    /// Peak to peak amplitude of the process value
    pub amplitude: f64,
}

/// The gain sets suggested by a successful tuning session.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestedGains {
    pub measurement: RelayMeasurement,
    pub classic_pid: PidGains,
    pub p: PidGains,
    pub pi: PidGains,
    pub pd: PidGains,
    pub no_overshoot: PidGains,
    pub pessen: PidGains,
    pub some_overshoot: PidGains,
}

/// Outcome of a tuning session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TuningResult {
    /// True if the gains can be used.
    pub success: bool,

    pub description: String,

    pub suggested: Option<SuggestedGains>,
}

/// A relay feedback tuning session.
#[derive(Debug, Clone)]
pub struct RelayTuner {
    config: TuneConfig,
    state: TunerState,
    detector: ExtremaDetector,

    /// Last relay command, used to hold the command inside the noise band
    last_command: Option<f64>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum TunerState {
    Running,
    Converged(TuningResult),
    Cancelled,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for TuneConfig {
    fn default() -> Self {
        Self {
            setpoint: 0.0,
            step_high: 1.0,
            step_low: -1.0,
            noise_band: 0.0,
            disable_noise_band_after: 2,
            cycle_count: 5,
            max_cycle_count: 20,
            look_back: 3,
            allowed_amplitude_variance: 0.1,
        }
    }
}

impl ExtremaDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a point, returning the newly found extremum if there is one.
    ///
    /// A point can only be classified once its successor is known, so any
    /// extremum found is at least one point old.
    pub fn push(&mut self, point: Point) -> Option<Point> {
        self.points.push(point);

        let n = self.points.len();
        if n < 3 {
            return None;
        }

        let before = self.extrema.len();
        self.classify(n - 2);

        if self.extrema.len() > before {
            self.extrema.last().copied()
        } else {
            None
        }
    }

    pub fn extrema(&self) -> &[Point] {
        &self.extrema
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Classify the point at `i`, which must have neighbours either side.
    fn classify(&mut self, i: usize) {
        let prev = self.points[i - 1].value;
        let cur = self.points[i].value;
        let next = self.points[i + 1].value;

        if let Some(start) = self.plateau_start {
            // Still on the plateau
            if cur == next {
                return;
            }

            // Plateau ends here, it's an extremum if both sides fall away (or
            // rise away) from it
            let outside = self.points[start - 1].value;
            if (cur < outside && cur < next) || (cur > outside && cur > next) {
                let mid = (start + i + 1) / 2;
                self.extrema.push(self.points[mid]);
            }
            self.plateau_start = None;
            return;
        }

        if (cur < prev && cur < next) || (cur > prev && cur > next) {
            self.extrema.push(self.points[i]);
        } else if cur == next && cur != prev {
            self.plateau_start = Some(i);
        }
    }
}

/// Find the local extrema of a series of points.
pub fn find_local_extrema(points: &[Point]) -> Vec<Point> {
    let mut detector = ExtremaDetector::new();
    for p in points {
        detector.push(*p);
    }
    detector.extrema
}

impl RelayMeasurement {
    /// Measure the oscillation from the last `look_back` extrema.
    ///
    /// `relay_amplitude` is the difference between the high and low steps.
    /// Returns `None` if there aren't enough extrema or the oscillation is
    /// degenerate.
    pub fn from_extrema(extrema: &[Point], relay_amplitude: f64, look_back: usize) -> Option<Self> {
        let look_back = look_back.max(MIN_LOOK_BACK);
        if extrema.len() < look_back {
            return None;
        }

        let recent = &extrema[extrema.len() - look_back..];
        let span_s = recent.last()?.time_s - recent.first()?.time_s;

        // Extrema are half a period apart
        let tu_s = span_s / (recent.len() - 1) as f64 * 2.0;

        let (min, max) = recent
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
                (lo.min(p.value), hi.max(p.value))
            });
        let amplitude = max - min;

        if !(tu_s > 0.0) || !(amplitude > 0.0) {
            return None;
        }

        Some(Self {
            ku: 4.0 * relay_amplitude.abs() / (PI * amplitude),
            tu_s,
            amplitude,
        })
    }
}

impl SuggestedGains {
    pub fn from_measurement(m: RelayMeasurement) -> Self {
        let (ku, tu) = (m.ku, m.tu_s);

        Self {
            measurement: m,
            classic_pid: PidGains::new(0.6 * ku, 1.2 * ku / tu, 0.075 * ku * tu),
            p: PidGains::new(0.5 * ku, 0.0, 0.0),
            pi: PidGains::new(0.45 * ku, 0.54 * ku / tu, 0.0),
            pd: PidGains::new(0.8 * ku, 0.0, 0.1 * ku * tu),
            no_overshoot: PidGains::new(0.2 * ku, 0.4 * ku / tu, 0.0666 * ku * tu),
            pessen: PidGains::new(0.7 * ku, 1.75 * ku / tu, 0.105 * ku * tu),
            some_overshoot: PidGains::new(0.33 * ku, 0.66 * ku / tu, 0.11 * ku * tu),
        }
    }

    /// All gain sets with their display names.
    pub fn named(&self) -> Vec<(&'static str, PidGains)> {
        vec![
            ("P", self.p),
            ("PI", self.pi),
            ("PD", self.pd),
            ("PID", self.classic_pid),
            ("N. OS", self.no_overshoot),
            ("Pessen", self.pessen),
            ("S. OS", self.some_overshoot),
        ]
    }
}

impl RelayTuner {
    pub fn new(config: TuneConfig) -> Self {
        info!(
            "Relay tune started: setpoint {}, steps {}/{}",
            config.setpoint, config.step_high, config.step_low
        );

        Self {
            config,
            state: TunerState::Running,
            detector: ExtremaDetector::new(),
            last_command: None,
        }
    }

    pub fn state(&self) -> &TunerState {
        &self.state
    }

    pub fn config(&self) -> &TuneConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.state == TunerState::Running
    }

    /// The result, once converged.
    pub fn result(&self) -> Option<&TuningResult> {
        match &self.state {
            TunerState::Converged(r) => Some(r),
            _ => None,
        }
    }

    /// Number of extrema found so far.
    pub fn num_extrema(&self) -> usize {
        self.detector.extrema().len()
    }

    /// Stop the session. Has no effect once the session has finished.
    pub fn cancel(&mut self) {
        if self.is_running() {
            info!("Relay tune cancelled");
            self.state = TunerState::Cancelled;
        }
    }

    /// Feed a new process value into the tuner and get the command to apply
    /// to the plant.
    ///
    /// Once the session has finished the command is always zero.
    pub fn update(&mut self, value: f64, time_s: f64) -> f64 {
        if !self.is_running() {
            return 0.0;
        }

        if let Some(e) = self.detector.push(Point { time_s, value }) {
            debug!(
                "Tuner extremum {} at {:.3} s: {:.3}",
                self.num_extrema(),
                e.time_s,
                e.value
            );
        }

        if let Some(result) = self.check_convergence() {
            info!("Relay tune finished: {}", result.description);
            self.state = TunerState::Converged(result);
            return 0.0;
        }

        let command = self.relay(value);
        self.last_command = Some(command);
        command
    }

    /// The relay, with hysteresis while the noise band is active.
    fn relay(&self, value: f64) -> f64 {
        let c = &self.config;
        let band = if self.num_extrema() < c.disable_noise_band_after {
            c.noise_band.abs()
        } else {
            0.0
        };

        let high_low = |below: bool| if below { c.step_high } else { c.step_low };

        match self.last_command {
            Some(last) if band > 0.0 => {
                if value < c.setpoint - band {
                    c.step_high
                } else if value > c.setpoint + band {
                    c.step_low
                } else {
                    last
                }
            }
            _ => high_low(value < c.setpoint),
        }
    }

    /// Decide whether the oscillation has been measured well enough.
    fn check_convergence(&self) -> Option<TuningResult> {
        let c = &self.config;
        let extrema = self.detector.extrema();

        if extrema.len() <= c.cycle_count {
            return None;
        }

        let look_back = c.look_back.max(MIN_LOOK_BACK);
        let spread = amplitude_spread(&extrema[extrema.len().saturating_sub(look_back)..]);
        let consistent = spread.map_or(false, |s| s <= c.allowed_amplitude_variance);
        let forced = extrema.len() > c.max_cycle_count;

        if !consistent && !forced {
            return None;
        }

        let relay_amplitude = c.step_high - c.step_low;
        let result = match RelayMeasurement::from_extrema(extrema, relay_amplitude, look_back) {
            None => TuningResult {
                success: false,
                description: String::from("Oscillation too small to measure"),
                suggested: None,
            },
            Some(m) if consistent => TuningResult {
                success: true,
                description: format!("Ku = {:.4}, Tu = {:.3} s", m.ku, m.tu_s),
                suggested: Some(SuggestedGains::from_measurement(m)),
            },
            Some(m) => TuningResult {
                success: false,
                description: format!(
                    "Amplitude varied by {:.0}% after {} extrema (Ku = {:.4}, Tu = {:.3} s)",
                    spread.unwrap_or(f64::NAN) * 100.0,
                    extrema.len(),
                    m.ku,
                    m.tu_s
                ),
                suggested: Some(SuggestedGains::from_measurement(m)),
            },
        };

        Some(result)
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Spread of the half cycle amplitudes between consecutive extrema, as
/// `(max - min) / mean`.
fn amplitude_spread(extrema: &[Point]) -> Option<f64> {
    let amplitudes: Vec<f64> = extrema
        .windows(2)
        .map(|w| (w[1].value - w[0].value).abs())
        .collect();

    if amplitudes.is_empty() {
        return None;
    }

    let mean = amplitudes.iter().sum::<f64>() / amplitudes.len() as f64;
    if !(mean > 0.0) {
        return None;
    }

    let max = amplitudes.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let min = amplitudes.iter().cloned().fold(f64::INFINITY, f64::min);

    Some((max - min) / mean)
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    fn pts(values: &[f64]) -> Vec<Point> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| Point {
                time_s: i as f64,
                value: *v,
            })
            .collect()
    }

    #[test]
    fn test_simple_extrema() {
        let e = find_local_extrema(&pts(&[0.0, 1.0, 0.0, -1.0, 0.0, 2.0, 1.0]));
        let times: Vec<f64> = e.iter().map(|p| p.time_s).collect();
        assert_eq!(times, vec![1.0, 3.0, 5.0]);
    }

    #[test]
    fn test_plateau_midpoint() {
        // Quantised sine with flat tops three samples wide
        let values: Vec<f64> = (0..60)
            .map(|i| (10.0 * (2.0 * PI * i as f64 / 20.0).sin()).round())
            .collect();
        let e = find_local_extrema(&pts(&values));
        let times: Vec<f64> = e.iter().map(|p| p.time_s).collect();

        assert_eq!(times, vec![5.0, 15.0, 25.0, 35.0, 45.0, 55.0]);
        assert_eq!(e[0].value, 10.0);
        assert_eq!(e[1].value, -10.0);
    }

    #[test]
    fn test_plateau_on_a_slope_is_not_an_extremum() {
        let e = find_local_extrema(&pts(&[0.0, 1.0, 1.0, 1.0, 2.0, 3.0, 2.0]));
        let times: Vec<f64> = e.iter().map(|p| p.time_s).collect();
        assert_eq!(times, vec![5.0]);
    }

    #[test]
    fn test_measurement() {
        // Square-ish oscillation between -2 and 2 with extrema every 3 s
        let extrema = pts(&[2.0, -2.0, 2.0, -2.0])
            .into_iter()
            .map(|mut p| {
                p.time_s *= 3.0;
                p
            })
            .collect::<Vec<_>>();

        let m = RelayMeasurement::from_extrema(&extrema, 2.0, 3).unwrap();
        assert_relative_eq!(m.tu_s, 6.0);
        assert_relative_eq!(m.amplitude, 4.0);
        assert_relative_eq!(m.ku, 8.0 / (PI * 4.0));

        let g = SuggestedGains::from_measurement(m);
        assert_relative_eq!(g.classic_pid.k_p, 0.6 * m.ku);
        assert_relative_eq!(g.classic_pid.k_i, 1.2 * m.ku / 6.0);
        assert_relative_eq!(g.classic_pid.k_d, 0.075 * m.ku * 6.0);
        assert_eq!(g.named().len(), 7);

        // Flat signal can't be measured
        assert!(RelayMeasurement::from_extrema(&pts(&[1.0, 1.0, 1.0]), 2.0, 3).is_none());
    }

    /// Pure integrator plant `x(t+1) = x(t) + command * k`.
    fn run_integrator(config: TuneConfig, k: f64, max_ticks: usize) -> RelayTuner {
        let mut tuner = RelayTuner::new(config);
        let mut x = 3.0;

        for i in 0..max_ticks {
            let command = tuner.update(x, i as f64 * 0.1);
            if !tuner.is_running() {
                break;
            }
            x += command * k;
        }

        tuner
    }

    #[test]
    fn test_converges_on_integrator() {
        let tuner = run_integrator(TuneConfig::default(), 0.5, 1000);

        let result = tuner.result().expect("tuner did not converge");
        assert!(result.success, "{}", result.description);

        let g = result.suggested.unwrap().classic_pid;
        assert!(g.k_p > 0.0 && g.k_i > 0.0 && g.k_d > 0.0);
    }

    #[test]
    fn test_converges_with_noise_band() {
        let config = TuneConfig {
            noise_band: 1.2,
            disable_noise_band_after: 4,
            ..Default::default()
        };
        let tuner = run_integrator(config, 0.5, 1000);

        let result = tuner.result().expect("tuner did not converge");
        assert!(result.suggested.is_some());
        assert!(result.suggested.unwrap().classic_pid.k_p > 0.0);
    }

    #[test]
    fn test_never_converges_without_oscillation() {
        let mut tuner = RelayTuner::new(TuneConfig::default());
        for i in 0..500 {
            tuner.update(i as f64, i as f64);
        }
        assert!(tuner.is_running());
        assert_eq!(tuner.num_extrema(), 0);
    }

    #[test]
    fn test_cancel_is_terminal_and_idempotent() {
        let mut tuner = RelayTuner::new(TuneConfig::default());
        assert_eq!(tuner.update(-1.0, 0.0), 1.0);
        assert_eq!(tuner.update(1.0, 0.1), -1.0);

        tuner.cancel();
        tuner.cancel();
        assert_eq!(tuner.state(), &TunerState::Cancelled);
        assert_eq!(tuner.update(-1.0, 0.2), 0.0);
    }

    #[test]
    fn test_converged_is_terminal() {
        let mut tuner = run_integrator(TuneConfig::default(), 0.5, 1000);
        let result = tuner.result().cloned();

        tuner.cancel();
        assert_eq!(tuner.result().cloned(), result);
        assert_eq!(tuner.update(-10.0, 1e6), 0.0);
    }
}
