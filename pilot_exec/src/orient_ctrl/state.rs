//! Implementations for the OrientCtrl state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{info, trace};
use serde::Serialize;

// Internal
use super::{OrientCtrlError, Params};
use crate::{
    filters::{Filter, HeadingFilter},
    nav::geo,
    params::ParamsError,
    pid::{PidStage, TuningResult},
};
use comms_if::eqpt::HeadingSample;
use util::module::State;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Orientation control module state
#[derive(Debug)]
pub struct OrientCtrl {
    pub(crate) params: Params,

    enabled: bool,

    /// Desired heading.
    ///
    /// Units: degrees, [0, 360)
    desired_deg: f64,

    heading_filter: HeadingFilter,
    filtered_heading_deg: Option<f64>,

    stage: PidStage,

    report: StatusReport,
}

/// Input data to orientation control.
#[derive(Debug, Clone, Copy)]
pub struct InputData {
    /// The new compass heading
    pub heading: HeadingSample,

    /// The rate controller's current limit.
    ///
    /// Units: degrees/second
    pub max_rate_dps: f64,
}

/// Status report for OrientCtrl processing.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StatusReport {
    pub enabled: bool,
    pub tuning: bool,

    pub filtered_heading_deg: Option<f64>,

    /// Desired minus filtered heading, in (-180, 180]
    pub error_deg: Option<f64>,

    /// Set on the cycle a tuning session ends.
    pub tune_finished: Option<TuningResult>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for OrientCtrl {
    fn default() -> Self {
        let params = Params::default();
        Self {
            enabled: false,
            desired_deg: 0.0,
            heading_filter: HeadingFilter::new(params.heading_cutoff_hz),
            filtered_heading_deg: None,
            stage: PidStage::new(params.gains, params.derivative_cutoff_hz),
            report: StatusReport::default(),
            params,
        }
    }
}

impl State for OrientCtrl {
    type InitData = Params;
    type InitError = ParamsError;

    type InputData = InputData;
    type OutputData = Option<f64>;
    type StatusReport = StatusReport;
    type ProcError = OrientCtrlError;

    /// Initialise the OrientCtrl module with its parameters.
    fn init(&mut self, init_data: Self::InitData) -> Result<(), Self::InitError> {
        init_data.validate()?;
        *self = Self::default();
        self.set_params(&init_data);
        Ok(())
    }

    /// Process a new compass heading.
    ///
    /// The output is the desired rotation rate, limited to the given maximum,
    /// or `None` while the stage is disabled.
    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        let HeadingSample { heading_deg, time_s } = input_data.heading;
        if !heading_deg.is_finite() || !time_s.is_finite() {
            return Err(OrientCtrlError::NonFiniteHeading(heading_deg));
        }
        if !(input_data.max_rate_dps > 0.0) {
            return Err(OrientCtrlError::InvalidRateLimit(input_data.max_rate_dps));
        }

        self.report = StatusReport::default();

        let filtered = self.heading_filter.process(heading_deg, time_s);
        self.filtered_heading_deg = Some(filtered);

        let error_deg = geo::normalize_delta(self.desired_deg - filtered);

        let update = self
            .stage
            .update(error_deg, input_data.max_rate_dps, time_s, self.enabled);

        if let Some(ref result) = update.tune_finished {
            info!("OrientCtrl tuning finished: {}", result.description);
            self.params.gains = self.stage.gains();
            self.enabled = false;
            self.report.tune_finished = update.tune_finished.clone();
        }

        trace!(
            "OrientCtrl: heading {:.1} deg, desired {:.1} deg, rate {:?}",
            filtered,
            self.desired_deg,
            update.output
        );

        self.report.enabled = self.enabled;
        self.report.tuning = self.stage.is_tuning();
        self.report.filtered_heading_deg = Some(filtered);
        self.report.error_deg = Some(error_deg);

        Ok((update.output, self.report.clone()))
    }
}

impl OrientCtrl {
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn enable(&mut self) {
        if !self.enabled {
            info!("OrientCtrl enabled, holding {:.1} deg", self.desired_deg);
            self.stage.reset();
        }
        self.enabled = true;
    }

    pub fn disable(&mut self) {
        if self.enabled {
            info!("OrientCtrl disabled");
        }
        self.enabled = false;
    }

    /// Desired heading.
    ///
    /// Units: degrees
    pub fn desired(&self) -> f64 {
        self.desired_deg
    }

    pub fn set_desired(&mut self, heading_deg: f64) {
        self.desired_deg = geo::normalize_heading(heading_deg);
    }

    /// The most recent filtered compass heading.
    pub fn filtered_heading(&self) -> Option<f64> {
        self.filtered_heading_deg
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn set_params(&mut self, params: &Params) {
        self.heading_filter.set_cutoff_hz(params.heading_cutoff_hz);
        self.stage.set_gains(params.gains);
        self.stage.set_derivative_cutoff_hz(params.derivative_cutoff_hz);
        self.params = params.clone();
    }

    pub fn is_tuning(&self) -> bool {
        self.stage.is_tuning()
    }

    /// Start a relay tuning session which takes over the desired rate output.
    pub fn start_tune(&mut self, now_s: f64) {
        info!("OrientCtrl tuning started about {:.1} deg", self.desired_deg);
        self.stage.start_tune(self.params.tune.to_config(), now_s);
    }

    /// Cancel a running tuning session, leaving the stage disabled. Returns
    /// `None` if nothing was being tuned.
    pub fn cancel_tune(&mut self) -> Option<TuningResult> {
        let result = self.stage.cancel_tune()?;
        info!("OrientCtrl tuning cancelled");
        self.enabled = false;
        Some(result)
    }

    pub fn tune_elapsed_s(&self, now_s: f64) -> Option<f64> {
        self.stage.tune_elapsed_s(now_s)
    }

    pub fn tuning_result(&self) -> Option<&TuningResult> {
        self.stage.last_result()
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
