//! The autopilot cascade

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{info, trace, warn};

// Internal
use super::{AutopilotError, AutopilotStatus, SavedGains};
use crate::{
    motor::MotorOutput,
    nav::GpsFilter,
    orient_ctrl::{self, OrientCtrl},
    params::PilotParams,
    path_ctrl::{self, PathCtrl},
    pid::{TuningResult, ADOPTED_GAINS_SIG_FIGS},
    rate_ctrl::{self, RateCtrl},
};
use comms_if::{
    eqpt::{HeadingSample, LatLon, PositionSample},
    tc::Stage,
};
use util::module::State;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The control cascade and its sensor conditioning.
#[derive(Debug)]
pub struct Autopilot {
    pub(super) params: PilotParams,

    pub(super) gps: GpsFilter,
    pub(super) path: PathCtrl,
    pub(super) orient: OrientCtrl,
    pub(super) rate: RateCtrl,
    pub(super) motor: MotorOutput,

    /// Presets recorded from tuning sessions, newest first.
    saved_gains: Vec<SavedGains>,

    /// Latest time seen from a sample or poll.
    ///
    /// Units: seconds
    now_s: f64,

    /// Time at which the desired rate is zeroed after orientation control was
    /// disabled.
    rate_zero_due_s: Option<f64>,

    path_report: path_ctrl::StatusReport,
    path_complete: bool,
    max_rate_dps: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Autopilot {
    /// Create the autopilot with every stage disabled.
    pub fn new(params: PilotParams) -> Result<Self, AutopilotError> {
        params.validate()?;

        let mut path = PathCtrl::default();
        path.init((params.path.clone(), params.drift.clone()))?;

        let mut orient = OrientCtrl::default();
        orient.init(params.orientation.clone())?;

        let mut rate = RateCtrl::default();
        rate.init(params.rate.clone())?;

        let max_rate_dps = rate.max_rotation_rate_dps(None);

        Ok(Self {
            gps: GpsFilter::new(&params.gps),
            path,
            orient,
            rate,
            motor: MotorOutput::new(),
            saved_gains: Vec::new(),
            now_s: 0.0,
            rate_zero_due_s: None,
            path_report: path_ctrl::StatusReport::default(),
            path_complete: false,
            max_rate_dps,
            params,
        })
    }

    // ---- SENSOR INPUTS ----

    /// Run the orientation and rotation rate stages on a new compass heading.
    pub fn on_heading(&mut self, sample: HeadingSample) {
        self.poll(sample.time_s);

        let speed_mps = self.gps.speed_mps();
        self.max_rate_dps = self.rate.max_rotation_rate_dps(speed_mps);

        let orient_input = orient_ctrl::InputData {
            heading: sample,
            max_rate_dps: self.max_rate_dps,
        };
        let desired_rate_dps = match self.orient.proc(&orient_input) {
            Ok((out, report)) => {
                if let Some(result) = report.tune_finished {
                    self.on_tune_finished(Stage::Orientation, result);
                }
                out
            }
            Err(e) => {
                warn!("Error during OrientCtrl processing: {}", e);
                return;
            }
        };

        // Rate control runs on the desired rate from the previous sample
        let rate_input = rate_ctrl::InputData {
            heading: sample,
            speed_mps,
        };
        match self.rate.proc(&rate_input) {
            Ok((power, report)) => {
                if let Some(p) = power {
                    self.motor.command(p);
                }
                if let Some(result) = report.tune_finished {
                    self.on_tune_finished(Stage::RotationRate, result);
                }
            }
            Err(e) => warn!("Error during RateCtrl processing: {}", e),
        }

        if let Some(r) = desired_rate_dps {
            self.rate.set_desired(r);
        }
    }

    /// Filter a GPS reading and run path control on it. `None` means the
    /// receiver has no fix, which changes nothing.
    pub fn on_position(&mut self, sample: Option<PositionSample>) {
        let raw = match sample {
            Some(s) => s,
            None => {
                trace!("No GPS fix");
                return;
            }
        };
        self.poll(raw.time_s);

        let position = match self.gps.process(&raw) {
            Some(p) => p,
            None => return,
        };

        let input = path_ctrl::InputData {
            position,
            compass_heading_deg: self.orient.filtered_heading(),
        };
        match self.path.proc(&input) {
            Ok((desired, report)) => {
                if let Some(heading_deg) = desired {
                    self.orient.set_desired(heading_deg);
                }
                if report.path_complete {
                    self.path_complete = true;
                }
                self.path_report = report;
            }
            Err(e) => warn!("Error during PathCtrl processing: {}", e),
        }
    }

    /// Advance the autopilot's clock, applying grace delayed commands and
    /// tuning timeouts which are due.
    pub fn poll(&mut self, now_s: f64) {
        if now_s > self.now_s {
            self.now_s = now_s;
        }

        self.motor.poll(self.now_s);

        if let Some(due) = self.rate_zero_due_s {
            if self.now_s >= due {
                self.rate_zero_due_s = None;
                if !self.orient.is_enabled() && !self.orient.is_tuning() {
                    info!("Orientation control off, desired rate set to zero");
                    self.rate.set_desired(0.0);
                }
            }
        }

        let timed_out = |elapsed: Option<f64>, timeout_s: f64| elapsed.map_or(false, |e| e > timeout_s);

        if timed_out(
            self.orient.tune_elapsed_s(self.now_s),
            self.params.orientation.tune.timeout_s,
        ) {
            warn!("Orientation tuning timed out");
            self.cancel_autotune(Stage::Orientation);
        }
        if timed_out(
            self.rate.tune_elapsed_s(self.now_s),
            self.params.rate.tune.timeout_s,
        ) {
            warn!("Rotation rate tuning timed out");
            self.cancel_autotune(Stage::RotationRate);
        }
    }

    // ---- COMMANDS ----

    /// Replace the waypoint list. An empty list stops path following.
    pub fn set_waypoints(&mut self, waypoints: Vec<LatLon>) {
        self.path.set_waypoints(waypoints);
        self.path_complete = false;
    }

    /// Set the heading held by orientation control. While a path is being
    /// followed this is replaced on the next GPS fix.
    pub fn set_desired_heading(&mut self, heading_deg: f64) {
        self.orient.set_desired(heading_deg);
    }

    /// Set the rotation rate held by rate control. While orientation control
    /// is running this is replaced on the next compass sample.
    pub fn set_desired_rotation_rate(&mut self, rate_dps: f64) {
        self.rate.set_desired(rate_dps);
    }

    /// Enable a stage and every stage below it.
    pub fn enable(&mut self, stage: Stage) -> Result<(), AutopilotError> {
        match stage {
            Stage::Path => {
                self.path.enable().map_err(|_| AutopilotError::NoWaypoints)?;
                self.path_complete = false;
                self.enable(Stage::Orientation)
            }
            Stage::Orientation => {
                self.orient.enable();
                self.rate_zero_due_s = None;
                self.enable(Stage::RotationRate)
            }
            Stage::RotationRate => {
                self.rate.enable();
                self.motor.cancel_neutral();
                Ok(())
            }
        }
    }

    /// Disable a stage, cancelling any tuning on it.
    ///
    /// The stage below is brought to neutral after the grace delay: motor
    /// power for rotation rate, desired rate for orientation. Orientation
    /// keeps holding the last heading when the path is disabled.
    pub fn disable(&mut self, stage: Stage) {
        self.cancel_autotune(stage);
        let grace_s = self.params.motor.disable_grace_s;

        match stage {
            Stage::Path => self.path.disable(),
            Stage::Orientation => {
                if self.orient.is_enabled() {
                    self.orient.disable();
                    self.rate_zero_due_s = Some(self.now_s + grace_s);
                }
            }
            Stage::RotationRate => {
                if self.rate.is_enabled() {
                    self.rate.disable();
                    self.motor.schedule_neutral(self.now_s + grace_s);
                }
            }
        }
    }

    pub fn is_enabled(&self, stage: Stage) -> bool {
        match stage {
            Stage::Path => self.path.is_enabled(),
            Stage::Orientation => self.orient.is_enabled(),
            Stage::RotationRate => self.rate.is_enabled(),
        }
    }

    // ---- TUNING ----

    /// Hand a stage's output to a relay tuner.
    ///
    /// The session runs on the following samples, its outcome is available
    /// from [`Autopilot::tuning_result`] once it ends. Tuning orientation
    /// enables rate control, tuning rate control stops the stages above it.
    pub fn start_autotune(&mut self, stage: Stage) -> Result<(), AutopilotError> {
        if self.is_tuning(stage) {
            return Err(AutopilotError::AlreadyTuning(stage));
        }

        match stage {
            Stage::Path => return Err(AutopilotError::CannotTune(stage)),
            Stage::Orientation => {
                self.path.disable();
                self.cancel_autotune(Stage::RotationRate);
                self.rate_zero_due_s = None;
                self.orient.start_tune(self.now_s);
                self.enable(Stage::RotationRate)?;
            }
            Stage::RotationRate => {
                self.path.disable();
                self.cancel_autotune(Stage::Orientation);
                self.orient.disable();
                self.rate_zero_due_s = None;
                self.rate.set_desired(0.0);
                self.motor.cancel_neutral();
                self.rate.start_tune(self.now_s);
            }
        }

        Ok(())
    }

    /// Cancel tuning on a stage, commanding zero from it straight away. Does
    /// nothing if the stage isn't being tuned.
    pub fn cancel_autotune(&mut self, stage: Stage) {
        match stage {
            Stage::Path => (),
            Stage::Orientation => {
                if let Some(result) = self.orient.cancel_tune() {
                    self.rate.set_desired(0.0);
                    self.on_tune_finished(stage, result);
                }
            }
            Stage::RotationRate => {
                if let Some(result) = self.rate.cancel_tune() {
                    self.motor.command(0.0);
                    self.on_tune_finished(stage, result);
                }
            }
        }
    }

    pub fn is_tuning(&self, stage: Stage) -> bool {
        match stage {
            Stage::Path => false,
            Stage::Orientation => self.orient.is_tuning(),
            Stage::RotationRate => self.rate.is_tuning(),
        }
    }

    /// Outcome of the most recent tuning session on a stage.
    pub fn tuning_result(&self, stage: Stage) -> Option<&TuningResult> {
        match stage {
            Stage::Path => None,
            Stage::Orientation => self.orient.tuning_result(),
            Stage::RotationRate => self.rate.tuning_result(),
        }
    }

    /// Record the outcome of a tuning session.
    ///
    /// The stage has already adopted the gains, the parameter copy follows it
    /// and every candidate is kept as a preset.
    fn on_tune_finished(&mut self, stage: Stage, result: TuningResult) {
        match stage {
            Stage::Orientation => self.params.orientation.gains = self.orient.params().gains,
            Stage::RotationRate => self.params.rate.gains = self.rate.params().gains,
            Stage::Path => (),
        }

        if !result.success {
            info!("{} tuning ended without new gains: {}", stage, result.description);
            return;
        }

        if let Some(suggested) = result.suggested {
            let time = chrono::Local::now().format("%H:%M:%S");
            let presets: Vec<SavedGains> = suggested
                .named()
                .into_iter()
                .map(|(name, gains)| SavedGains {
                    title: format!("Auto Tune - {} - {}", name, time),
                    stage,
                    gains: gains.to_precision(ADOPTED_GAINS_SIG_FIGS),
                })
                .collect();

            info!("{} tuned, {} gain presets saved", stage, presets.len());
            self.saved_gains.splice(0..0, presets);
        }
    }

    // ---- CONFIGURATION ----

    pub fn params(&self) -> &PilotParams {
        &self.params
    }

    /// Install a new parameter set. Invalid sets are rejected and leave the
    /// current parameters in place.
    pub fn set_params(&mut self, params: PilotParams) -> Result<(), AutopilotError> {
        params.validate()?;

        self.gps.set_params(&params.gps);
        self.path.set_params(&params.path, &params.drift);
        self.orient.set_params(&params.orientation);
        self.rate.set_params(&params.rate);
        self.params = params;

        info!("Parameters reloaded");
        Ok(())
    }

    /// Gain presets, newest first.
    pub fn saved_gains(&self) -> &[SavedGains] {
        &self.saved_gains
    }

    /// Apply the preset with the given title to its stage.
    pub fn apply_saved_gains(&mut self, title: &str) -> Result<(), AutopilotError> {
        let preset = self
            .saved_gains
            .iter()
            .find(|g| g.title == title)
            .cloned()
            .ok_or_else(|| AutopilotError::UnknownSavedGains(title.to_string()))?;

        let mut params = self.params.clone();
        match preset.stage {
            Stage::Orientation => params.orientation.gains = preset.gains,
            Stage::RotationRate => params.rate.gains = preset.gains,
            Stage::Path => return Err(AutopilotError::UnknownSavedGains(title.to_string())),
        }

        info!("Applying \"{}\" to {}", title, preset.stage);
        self.set_params(params)
    }

    // ---- OUTPUTS ----

    pub fn now_s(&self) -> f64 {
        self.now_s
    }

    pub fn motor_output(&self) -> &MotorOutput {
        &self.motor
    }

    pub fn motor_output_mut(&mut self) -> &mut MotorOutput {
        &mut self.motor
    }

    pub fn status(&self) -> AutopilotStatus {
        let drift = self.path.drift();

        AutopilotStatus {
            time_s: self.now_s,
            path_enabled: self.path.is_enabled(),
            orientation_enabled: self.orient.is_enabled(),
            rotation_rate_enabled: self.rate.is_enabled(),
            orientation_tuning: self.orient.is_tuning(),
            rotation_rate_tuning: self.rate.is_tuning(),
            desired_heading_deg: self.orient.desired(),
            desired_rate_dps: self.rate.desired(),
            filtered_heading_deg: self.orient.filtered_heading(),
            filtered_rate_dps: self.rate.filtered_rate(),
            max_rate_dps: self.max_rate_dps,
            motor_power: self.motor.power(),
            motor_connected: self.motor.connected(),
            position: self.gps.latest().map(|p| p.position),
            speed_mps: self.gps.speed_mps(),
            heading_to_destination_deg: self.path.heading_to_destination(),
            distance_to_waypoint_m: self
                .path_report
                .distance_to_waypoint_m
                .filter(|_| self.path.is_enabled()),
            drift_deg: drift.map(|d| d.drift_deg),
            drift_lag_s: drift.map(|d| d.lag_s),
            waypoints_remaining: self.path.waypoints().len(),
            path_complete: self.path_complete,
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::pid::PidGains;
    use approx::assert_relative_eq;

    fn pilot() -> Autopilot {
        let mut params = PilotParams::default();
        params.orientation.gains = PidGains::new(0.5, 0.0, 0.0);
        params.rate.gains = PidGains::new(0.2, 0.0, 0.0);
        Autopilot::new(params).unwrap()
    }

    #[test]
    fn test_enable_cascades_down() {
        let mut ap = pilot();
        assert!(matches!(ap.enable(Stage::Path), Err(AutopilotError::NoWaypoints)));
        assert!(!ap.is_enabled(Stage::Orientation));

        ap.set_waypoints(vec![LatLon::new(50.0, -1.0)]);
        ap.enable(Stage::Path).unwrap();
        assert!(ap.is_enabled(Stage::Path));
        assert!(ap.is_enabled(Stage::Orientation));
        assert!(ap.is_enabled(Stage::RotationRate));
    }

    #[test]
    fn test_rate_uses_latched_desired() {
        let mut ap = pilot();
        ap.set_desired_heading(90.0);
        ap.enable(Stage::Orientation).unwrap();

        // Orientation asks for 0.5 * 10 = 5 deg/s, limited to 4 deg/s at the
        // reference speed. Rate control ran first and has no rate yet.
        ap.on_heading(HeadingSample::new(80.0, 0.0));
        assert_relative_eq!(ap.status().desired_rate_dps, 4.0, epsilon = 1e-9);
        assert_eq!(ap.motor_output().power(), 0.0);
    }

    #[test]
    fn test_disable_rate_neutral_after_grace() {
        let mut ap = pilot();
        ap.enable(Stage::RotationRate).unwrap();
        ap.set_desired_rotation_rate(-3.0);

        ap.on_heading(HeadingSample::new(0.0, 0.0));
        ap.on_heading(HeadingSample::new(0.0, 0.1));
        let power = ap.motor_output().power();
        assert!(power > 0.0, "power was {}", power);

        ap.disable(Stage::RotationRate);
        ap.poll(0.15);
        assert_eq!(ap.motor_output().power(), power);

        ap.poll(0.2);
        assert_eq!(ap.motor_output().power(), 0.0);
    }

    #[test]
    fn test_reenable_cancels_neutral() {
        let mut ap = pilot();
        ap.enable(Stage::RotationRate).unwrap();
        ap.motor_output_mut().command(0.5);

        ap.disable(Stage::RotationRate);
        ap.enable(Stage::RotationRate).unwrap();
        ap.poll(10.0);
        assert_eq!(ap.motor_output().power(), 0.5);
    }

    #[test]
    fn test_disable_orientation_zeroes_rate_after_grace() {
        let mut ap = pilot();
        ap.set_desired_heading(90.0);
        ap.enable(Stage::Orientation).unwrap();
        ap.on_heading(HeadingSample::new(80.0, 0.0));
        assert!(ap.status().desired_rate_dps > 0.0);

        ap.disable(Stage::Orientation);
        assert!(ap.is_enabled(Stage::RotationRate));
        ap.poll(0.05);
        assert!(ap.status().desired_rate_dps > 0.0);

        ap.poll(0.1);
        assert_eq!(ap.status().desired_rate_dps, 0.0);
    }

    #[test]
    fn test_tuning_commands() {
        let mut ap = pilot();
        assert!(matches!(
            ap.start_autotune(Stage::Path),
            Err(AutopilotError::CannotTune(Stage::Path))
        ));

        // Cancelling with nothing running is harmless
        ap.cancel_autotune(Stage::Orientation);
        assert!(ap.tuning_result(Stage::Orientation).is_none());

        ap.start_autotune(Stage::Orientation).unwrap();
        assert!(ap.is_tuning(Stage::Orientation));
        assert!(ap.is_enabled(Stage::RotationRate));
        assert!(matches!(
            ap.start_autotune(Stage::Orientation),
            Err(AutopilotError::AlreadyTuning(Stage::Orientation))
        ));

        ap.cancel_autotune(Stage::Orientation);
        ap.cancel_autotune(Stage::Orientation);
        assert!(!ap.is_tuning(Stage::Orientation));
        assert!(!ap.tuning_result(Stage::Orientation).unwrap().success);
        assert_eq!(ap.status().desired_rate_dps, 0.0);
        assert!(ap.saved_gains().is_empty());
    }

    #[test]
    fn test_tune_timeout_cancels() {
        let mut ap = pilot();
        ap.start_autotune(Stage::RotationRate).unwrap();

        ap.poll(ap.params().rate.tune.timeout_s - 1.0);
        assert!(ap.is_tuning(Stage::RotationRate));

        ap.poll(ap.params().rate.tune.timeout_s + 1.0);
        assert!(!ap.is_tuning(Stage::RotationRate));
        assert_eq!(ap.motor_output().power(), 0.0);
    }

    #[test]
    fn test_set_params_validates() {
        let mut ap = pilot();

        let mut bad = ap.params().clone();
        bad.path.arrival_radius_m = -1.0;
        assert!(matches!(ap.set_params(bad), Err(AutopilotError::InvalidParams(_))));
        assert_eq!(ap.params().path.arrival_radius_m, 20.0);

        let mut good = ap.params().clone();
        good.rate.max_rate_dps_per_kt = 2.0;
        ap.set_params(good).unwrap();
        ap.on_heading(HeadingSample::new(0.0, 0.0));
        assert_relative_eq!(ap.status().max_rate_dps, 2.0);
    }

    #[test]
    fn test_unknown_saved_gains() {
        let mut ap = pilot();
        assert!(matches!(
            ap.apply_saved_gains("Auto Tune - PID - 12:00:00"),
            Err(AutopilotError::UnknownSavedGains(_))
        ));
    }
}
