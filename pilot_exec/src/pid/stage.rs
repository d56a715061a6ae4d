//! # PID stage output ownership
//!
//! A cascade stage's output is produced either by its PID controller or, while
//! an auto-tune session runs, by a relay tuner. [`PidStage`] holds whichever
//! one currently owns the output and handles the hand over in both
//! directions.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{info, warn};

use util::maths::clamp_sym;

use super::{PidController, PidGains, RelayTuner, TuneConfig, TunerState, TuningResult};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Significant figures kept when adopting tuned gains.
pub const ADOPTED_GAINS_SIG_FIGS: i32 = 4;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A stage output source, with the tuning session bookkeeping.
#[derive(Debug)]
pub struct PidStage {
    owner: OutputOwner,

    /// The gains the PID runs with, kept while the tuner owns the output.
    gains: PidGains,

    derivative_cutoff_hz: f64,

    /// Time the current tuning session started.
    tune_started_s: Option<f64>,

    /// Result of the most recent tuning session.
    last_result: Option<TuningResult>,
}

/// Output of one stage update.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct StageUpdate {
    /// The command, `None` if nothing owns the output this tick.
    pub output: Option<f64>,

    /// Set on the tick a tuning session finishes.
    pub tune_finished: Option<TuningResult>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Which algorithm owns the output of a stage.
#[derive(Debug)]
pub enum OutputOwner {
    Pid(PidController),
    Tuning(RelayTuner),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PidStage {
    pub fn new(gains: PidGains, derivative_cutoff_hz: f64) -> Self {
        Self {
            owner: OutputOwner::Pid(PidController::new(gains, derivative_cutoff_hz, f64::INFINITY)),
            gains,
            derivative_cutoff_hz,
            tune_started_s: None,
            last_result: None,
        }
    }

    pub fn owner(&self) -> &OutputOwner {
        &self.owner
    }

    pub fn gains(&self) -> PidGains {
        self.gains
    }

    /// Change the PID gains, taking effect straight away unless a tuning
    /// session is running.
    pub fn set_gains(&mut self, gains: PidGains) {
        self.gains = gains;
        if let OutputOwner::Pid(ref mut pid) = self.owner {
            pid.set_gains(gains);
        }
    }

    pub fn set_derivative_cutoff_hz(&mut self, cutoff_hz: f64) {
        self.derivative_cutoff_hz = cutoff_hz;
        if let OutputOwner::Pid(ref mut pid) = self.owner {
            pid.set_derivative_cutoff_hz(cutoff_hz);
        }
    }

    /// Clear the PID history, used when a stage is (re)enabled.
    pub fn reset(&mut self) {
        if let OutputOwner::Pid(ref mut pid) = self.owner {
            pid.reset();
        }
    }

    pub fn is_tuning(&self) -> bool {
        matches!(self.owner, OutputOwner::Tuning(_))
    }

    /// Time since the running tuning session started.
    pub fn tune_elapsed_s(&self, now_s: f64) -> Option<f64> {
        match self.owner {
            OutputOwner::Tuning(_) => self.tune_started_s.map(|t| now_s - t),
            OutputOwner::Pid(_) => None,
        }
    }

    pub fn last_result(&self) -> Option<&TuningResult> {
        self.last_result.as_ref()
    }

    /// Hand the output to a new relay tuner. Any running session is replaced.
    pub fn start_tune(&mut self, config: TuneConfig, now_s: f64) {
        self.owner = OutputOwner::Tuning(RelayTuner::new(config));
        self.tune_started_s = Some(now_s);
        self.last_result = None;
    }

    /// Cancel the running tuning session and give the output back to the PID.
    ///
    /// Returns the failed result, or `None` if nothing was being tuned.
    pub fn cancel_tune(&mut self) -> Option<TuningResult> {
        match self.owner {
            OutputOwner::Tuning(ref mut tuner) => tuner.cancel(),
            OutputOwner::Pid(_) => return None,
        }

        let result = TuningResult {
            success: false,
            description: String::from("PID tuning cancelled"),
            suggested: None,
        };
        self.finish_tune(result.clone());

        Some(result)
    }

    /// Run the owner of the output for the given error.
    ///
    /// The PID only runs when `pid_active` is set, the tuner always runs. The
    /// tuner is fed the negated error so that it oscillates the error about
    /// zero. Outputs are limited to `±limit`.
    pub fn update(&mut self, error: f64, limit: f64, time_s: f64, pid_active: bool) -> StageUpdate {
        let mut update = StageUpdate::default();

        match self.owner {
            OutputOwner::Pid(ref mut pid) => {
                if pid_active {
                    pid.set_saturation_limit(limit);
                    update.output = Some(clamp_sym(pid.update(error, time_s), limit));
                }
            }
            OutputOwner::Tuning(ref mut tuner) => {
                let command = tuner.update(-error, time_s);
                update.output = Some(clamp_sym(command, limit));

                let finished = match tuner.state() {
                    TunerState::Running => None,
                    TunerState::Converged(r) => Some(r.clone()),
                    TunerState::Cancelled => Some(TuningResult {
                        success: false,
                        description: String::from("PID tuning cancelled"),
                        suggested: None,
                    }),
                };

                if let Some(result) = finished {
                    self.finish_tune(result.clone());
                    update.output = Some(0.0);
                    update.tune_finished = Some(result);
                }
            }
        }

        update
    }

    /// Give the output back to a fresh PID, adopting the classic gains of a
    /// successful session.
    fn finish_tune(&mut self, result: TuningResult) {
        match (&result.suggested, result.success) {
            (Some(suggested), true) => {
                self.gains = suggested.classic_pid.to_precision(ADOPTED_GAINS_SIG_FIGS);
                info!("Adopting tuned gains {:?}", self.gains);
            }
            _ => warn!("Tuning did not succeed ({}), keeping gains {:?}", result.description, self.gains),
        }

        self.owner = OutputOwner::Pid(PidController::new(
            self.gains,
            self.derivative_cutoff_hz,
            f64::INFINITY,
        ));
        self.tune_started_s = None;
        self.last_result = Some(result);
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_pid_only_runs_when_active() {
        let mut s = PidStage::new(PidGains::new(2.0, 0.0, 0.0), 1.0);

        assert_eq!(s.update(1.0, 10.0, 0.0, false).output, None);
        assert_eq!(s.update(1.0, 10.0, 0.1, true).output, Some(2.0));

        // Limited to the given bound
        assert_eq!(s.update(100.0, 10.0, 0.2, true).output, Some(10.0));
        assert_eq!(s.update(-100.0, 10.0, 0.3, true).output, Some(-10.0));
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let mut s = PidStage::new(PidGains::default(), 1.0);
        assert!(s.cancel_tune().is_none());

        s.start_tune(TuneConfig::default(), 5.0);
        assert!(s.is_tuning());
        assert_relative_eq!(s.tune_elapsed_s(7.5).unwrap(), 2.5);

        let r = s.cancel_tune().unwrap();
        assert!(!r.success);
        assert!(r.suggested.is_none());
        assert!(!s.is_tuning());
        assert!(s.cancel_tune().is_none());
        assert_eq!(s.last_result(), Some(&r));
    }

    #[test]
    fn test_tuner_owns_output_and_adopts_gains() {
        let mut s = PidStage::new(PidGains::new(9.0, 9.0, 9.0), 1.0);
        s.start_tune(TuneConfig::default(), 0.0);

        // Integrator plant, the error is the negated process value
        let mut x = 3.0;
        let mut finished = None;
        for i in 0..2000 {
            let update = s.update(-x, 10.0, i as f64 * 0.1, false);
            if let Some(r) = update.tune_finished {
                assert_eq!(update.output, Some(0.0));
                finished = Some(r);
                break;
            }
            x += update.output.unwrap_or(0.0) * 0.5;
        }

        let result = finished.expect("tuning never finished");
        assert!(result.success, "{}", result.description);
        assert!(!s.is_tuning());

        let classic = result.suggested.unwrap().classic_pid;
        assert_eq!(s.gains(), classic.to_precision(ADOPTED_GAINS_SIG_FIGS));
    }

    #[test]
    fn test_gain_change_deferred_while_tuning() {
        let mut s = PidStage::new(PidGains::default(), 1.0);
        s.start_tune(TuneConfig::default(), 0.0);
        s.set_gains(PidGains::new(1.0, 0.0, 0.0));
        s.cancel_tune();

        assert_eq!(s.update(1.0, 10.0, 1.0, true).output, Some(1.0));
    }
}
