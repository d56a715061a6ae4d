//! Implementations for the RateCtrl state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{info, trace};
use serde::Serialize;

// Internal
use super::{
    Params, RateCtrlError, MAX_POWER, REFERENCE_SPEED_KTS,
};
use crate::{
    filters::{Filter, HeadingFilter, LowPassFilter},
    nav::geo,
    params::ParamsError,
    pid::{PidStage, TuningResult},
};
use comms_if::eqpt::HeadingSample;
use util::{maths::clamp_sym, module::State};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Rotation rate control module state
#[derive(Debug)]
pub struct RateCtrl {
    pub(crate) params: Params,

    enabled: bool,

    /// Desired rotation rate, before limiting.
    ///
    /// Units: degrees/second, positive clockwise
    desired_dps: f64,

    heading_filter: HeadingFilter,
    rate_filter: LowPassFilter,

    /// Previous filtered heading and its time
    prev_heading: Option<(f64, f64)>,

    filtered_heading_deg: Option<f64>,
    filtered_rate_dps: Option<f64>,

    stage: PidStage,

    report: StatusReport,
}

/// Input data to rotation rate control.
#[derive(Debug, Clone, Copy)]
pub struct InputData {
    /// The new compass heading
    pub heading: HeadingSample,

    /// Speed over ground, `None` if unknown.
    ///
    /// Units: meters/second
    pub speed_mps: Option<f64>,
}

/// Status report for RateCtrl processing.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StatusReport {
    pub enabled: bool,
    pub tuning: bool,

    /// Rate limit in force this cycle.
    ///
    /// Units: degrees/second
    pub max_rate_dps: f64,

    pub filtered_heading_deg: Option<f64>,
    pub filtered_rate_dps: Option<f64>,

    /// Filtered rate minus the limited desired rate
    pub error_dps: Option<f64>,

    /// Set on the cycle a tuning session ends.
    pub tune_finished: Option<TuningResult>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for RateCtrl {
    fn default() -> Self {
        let params = Params::default();
        Self {
            enabled: false,
            desired_dps: 0.0,
            heading_filter: HeadingFilter::new(params.heading_cutoff_hz),
            rate_filter: LowPassFilter::new(params.rate_cutoff_hz),
            prev_heading: None,
            filtered_heading_deg: None,
            filtered_rate_dps: None,
            stage: PidStage::new(params.gains, params.derivative_cutoff_hz),
            report: StatusReport::default(),
            params,
        }
    }
}

impl State for RateCtrl {
    type InitData = Params;
    type InitError = ParamsError;

    type InputData = InputData;
    type OutputData = Option<f64>;
    type StatusReport = StatusReport;
    type ProcError = RateCtrlError;

    /// Initialise the RateCtrl module with its parameters.
    fn init(&mut self, init_data: Self::InitData) -> Result<(), Self::InitError> {
        init_data.validate()?;
        *self = Self::default();
        self.set_params(&init_data);
        Ok(())
    }

    /// Process a new compass heading.
    ///
    /// The output is the motor power, `None` while the stage is disabled or
    /// until a rate can be derived.
    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        let HeadingSample { heading_deg, time_s } = input_data.heading;
        if !heading_deg.is_finite() {
            return Err(RateCtrlError::NonFiniteHeading(heading_deg));
        }
        if !time_s.is_finite() {
            return Err(RateCtrlError::NonFiniteTime(time_s));
        }

        self.report = StatusReport::default();

        let filtered = self.heading_filter.process(heading_deg, time_s);
        self.filtered_heading_deg = Some(filtered);

        // Derive the rate from the change in filtered heading
        match self.prev_heading {
            Some((prev, prev_time_s)) if time_s > prev_time_s => {
                let raw_dps = geo::normalize_delta(filtered - prev) / (time_s - prev_time_s);
                self.filtered_rate_dps = Some(self.rate_filter.process(raw_dps, time_s));
                self.prev_heading = Some((filtered, time_s));
            }
            Some(_) => (),
            None => self.prev_heading = Some((filtered, time_s)),
        }

        let max_rate_dps = self.max_rotation_rate_dps(input_data.speed_mps);

        self.report.max_rate_dps = max_rate_dps;
        self.report.filtered_heading_deg = self.filtered_heading_deg;
        self.report.filtered_rate_dps = self.filtered_rate_dps;

        let rate_dps = match self.filtered_rate_dps {
            Some(r) => r,
            None => return Ok((None, self.finish_report())),
        };

        let error_dps = rate_dps - clamp_sym(self.desired_dps, max_rate_dps);
        self.report.error_dps = Some(error_dps);

        let update = self.stage.update(error_dps, MAX_POWER, time_s, self.enabled);

        if let Some(ref result) = update.tune_finished {
            info!("RateCtrl tuning finished: {}", result.description);
            self.params.gains = self.stage.gains();
            self.enabled = false;
            self.desired_dps = 0.0;
            self.report.tune_finished = update.tune_finished.clone();
        }

        trace!(
            "RateCtrl: rate {:.2} dps, desired {:.2} dps, limit {:.2} dps, power {:?}",
            rate_dps,
            self.desired_dps,
            max_rate_dps,
            update.output
        );

        Ok((update.output, self.finish_report()))
    }
}

impl RateCtrl {
    /// Largest rotation rate allowed at the given speed over ground.
    ///
    /// The limit only scales with speed above the reference speed. Slower
    /// boats, and those with unknown speed, get the reference limit.
    pub fn max_rotation_rate_dps(&self, speed_mps: Option<f64>) -> f64 {
        let speed_kts = speed_mps
            .filter(|s| s.is_finite())
            .map_or(REFERENCE_SPEED_KTS, |s| {
                geo::mps_to_knots(s).max(REFERENCE_SPEED_KTS)
            });

        self.params.max_rate_dps_per_kt * speed_kts
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn enable(&mut self) {
        if !self.enabled {
            info!("RateCtrl enabled");
            self.stage.reset();
        }
        self.enabled = true;
    }

    pub fn disable(&mut self) {
        if self.enabled {
            info!("RateCtrl disabled");
        }
        self.enabled = false;
    }

    /// Desired rotation rate.
    ///
    /// Units: degrees/second
    pub fn desired(&self) -> f64 {
        self.desired_dps
    }

    pub fn set_desired(&mut self, rate_dps: f64) {
        self.desired_dps = rate_dps;
    }

    pub fn filtered_heading(&self) -> Option<f64> {
        self.filtered_heading_deg
    }

    pub fn filtered_rate(&self) -> Option<f64> {
        self.filtered_rate_dps
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Install new parameters. Filter history is kept, PID history is only
    /// cleared if the gains change.
    pub fn set_params(&mut self, params: &Params) {
        self.heading_filter.set_cutoff_hz(params.heading_cutoff_hz);
        self.rate_filter.set_cutoff_hz(params.rate_cutoff_hz);
        self.stage.set_gains(params.gains);
        self.stage.set_derivative_cutoff_hz(params.derivative_cutoff_hz);
        self.params = params.clone();
    }

    pub fn is_tuning(&self) -> bool {
        self.stage.is_tuning()
    }

    /// Start a relay tuning session which takes over the motor output.
    pub fn start_tune(&mut self, now_s: f64) {
        info!("RateCtrl tuning started");
        self.stage.start_tune(self.params.tune.to_config(), now_s);
    }

    /// Cancel a running tuning session, leaving the stage disabled with a zero
    /// desired rate. Returns `None` if nothing was being tuned.
    pub fn cancel_tune(&mut self) -> Option<TuningResult> {
        let result = self.stage.cancel_tune()?;
        info!("RateCtrl tuning cancelled");
        self.enabled = false;
        self.desired_dps = 0.0;
        Some(result)
    }

    pub fn tune_elapsed_s(&self, now_s: f64) -> Option<f64> {
        self.stage.tune_elapsed_s(now_s)
    }

    pub fn tuning_result(&self) -> Option<&TuningResult> {
        self.stage.last_result()
    }

    fn finish_report(&mut self) -> StatusReport {
        self.report.enabled = self.enabled;
        self.report.tuning = self.stage.is_tuning();
        self.report.clone()
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

    fn input(heading_deg: f64, time_s: f64, speed_mps: Option<f64>) -> InputData {
        InputData {
            heading: HeadingSample::new(heading_deg, time_s),
            speed_mps,
        }
    }

    fn ctrl(gains: PidGains) -> RateCtrl {
        let mut c = RateCtrl::default();
        c.init(Params {
            gains,
            heading_cutoff_hz: 1000.0,
            rate_cutoff_hz: 1000.0,
            ..Default::default()
        })
        .unwrap();
        c
    }

    #[test]
    fn test_max_rate() {
        let c = RateCtrl::default();
        let three_kts = geo::knots_to_mps(3.0);

        assert_relative_eq!(c.max_rotation_rate_dps(Some(three_kts)), 12.0, epsilon = 1e-9);
        assert_relative_eq!(c.max_rotation_rate_dps(Some(0.0)), 4.0);
        assert_relative_eq!(c.max_rotation_rate_dps(None), 4.0);
    }

    #[test]
    fn test_max_rate_below_reference_speed() {
        let c = RateCtrl::default();

        // GPS jitter and slow drifting are limited like a stopped boat
        for &speed_mps in [0.02, 0.1, geo::knots_to_mps(0.5), geo::knots_to_mps(1.0)].iter() {
            assert_relative_eq!(c.max_rotation_rate_dps(Some(speed_mps)), 4.0, epsilon = 1e-9);
        }

        // Scaling resumes above a knot
        assert_relative_eq!(
            c.max_rotation_rate_dps(Some(geo::knots_to_mps(1.5))),
            6.0,
            epsilon = 1e-9
        );
        assert_relative_eq!(c.max_rotation_rate_dps(Some(f64::NAN)), 4.0);
    }

    #[test]
    fn test_rate_across_north() {
        let mut c = ctrl(PidGains::default());

        c.proc(&input(358.0, 0.0, None)).unwrap();
        let (_, report) = c.proc(&input(2.0, 1.0, None)).unwrap();

        // Crossing north clockwise is +4 deg/s, not -356
        let rate = report.filtered_rate_dps.unwrap();
        assert!((rate - 4.0).abs() < 0.1, "rate was {}", rate);
    }

    #[test]
    fn test_disabled_has_no_output() {
        let mut c = ctrl(PidGains::new(1.0, 0.0, 0.0));

        c.proc(&input(0.0, 0.0, None)).unwrap();
        let (out, _) = c.proc(&input(1.0, 1.0, None)).unwrap();
        assert_eq!(out, None);
    }

    #[test]
    fn test_first_sample_has_no_output() {
        let mut c = ctrl(PidGains::new(1.0, 0.0, 0.0));
        c.enable();

        let (out, report) = c.proc(&input(0.0, 0.0, None)).unwrap();
        assert_eq!(out, None);
        assert_eq!(report.filtered_rate_dps, None);
    }

    #[test]
    fn test_turning_too_fast_clockwise_gives_positive_power() {
        let mut c = ctrl(PidGains::new(0.1, 0.0, 0.0));
        c.enable();
        c.set_desired(0.0);

        let mut out = None;
        for i in 0..20 {
            let t = i as f64 * 0.1;
            out = c.proc(&input(geo::normalize_heading(2.0 * t), t, None)).unwrap().0;
        }

        // 2 deg/s too fast, so 0.2 of counterclockwise power
        let power = out.unwrap();
        assert!((power - 0.2).abs() < 0.02, "power was {}", power);
    }

    #[test]
    fn test_desired_rate_limited_by_speed() {
        let mut c = ctrl(PidGains::new(1.0, 0.0, 0.0));
        c.enable();
        c.set_desired(-100.0);

        c.proc(&input(90.0, 0.0, Some(0.0))).unwrap();
        let (out, report) = c.proc(&input(90.0, 1.0, Some(0.0))).unwrap();

        // Stationary so limited to 4 deg/s, the error is +4 and power saturates
        assert_relative_eq!(report.error_dps.unwrap(), 4.0, epsilon = 1e-9);
        assert_eq!(out, Some(1.0));
    }

    #[test]
    fn test_cancel_tune() {
        let mut c = ctrl(PidGains::default());
        assert!(c.cancel_tune().is_none());

        c.enable();
        c.set_desired(3.0);
        c.start_tune(10.0);
        assert!(c.is_tuning());

        let result = c.cancel_tune().unwrap();
        assert!(!result.success);
        assert!(!c.is_enabled());
        assert_eq!(c.desired(), 0.0);
        assert!(c.cancel_tune().is_none());
    }

    #[test]
    fn test_rejects_bad_samples() {
        let mut c = RateCtrl::default();
        assert!(matches!(
            c.proc(&input(f64::NAN, 0.0, None)),
            Err(RateCtrlError::NonFiniteHeading(_))
        ));
    }
}
