//! Implementations for the PathCtrl state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use std::collections::VecDeque;

use log::{debug, info};
use serde::Serialize;

// Internal
use super::{Params, PathCtrlError};
use crate::{
    drift::{DriftEstimate, DriftEstimator, DriftParams},
    nav::geo,
    params::ParamsError,
};
use comms_if::eqpt::{LatLon, PositionSample};
use util::module::State;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Path control module state
#[derive(Debug)]
pub struct PathCtrl {
    params: Params,

    enabled: bool,

    /// Remaining waypoints, the head is the current target.
    waypoints: VecDeque<LatLon>,

    drift: DriftEstimator,

    /// Bearing to the current waypoint before drift correction.
    heading_to_destination_deg: Option<f64>,

    latest_drift: Option<DriftEstimate>,
}

/// Input data to path control.
#[derive(Debug, Clone, Copy)]
pub struct InputData {
    /// A filtered, accepted GPS fix
    pub position: PositionSample,

    /// The filtered compass heading at the time of the fix, if known.
    pub compass_heading_deg: Option<f64>,
}

/// Status report for PathCtrl processing.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StatusReport {
    pub enabled: bool,

    /// Number of waypoints reached this cycle.
    pub waypoints_reached: usize,

    /// Set on the cycle the last waypoint is reached.
    pub path_complete: bool,

    pub waypoints_remaining: usize,

    /// Units: meters
    pub distance_to_waypoint_m: Option<f64>,

    pub heading_to_destination_deg: Option<f64>,

    pub drift: Option<DriftEstimate>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for PathCtrl {
    fn default() -> Self {
        Self {
            params: Params::default(),
            enabled: false,
            waypoints: VecDeque::new(),
            drift: DriftEstimator::new(&DriftParams::default()),
            heading_to_destination_deg: None,
            latest_drift: None,
        }
    }
}

impl State for PathCtrl {
    type InitData = (Params, DriftParams);
    type InitError = ParamsError;

    type InputData = InputData;
    type OutputData = Option<f64>;
    type StatusReport = StatusReport;
    type ProcError = PathCtrlError;

    /// Initialise the PathCtrl module with its own and the drift estimator's
    /// parameters.
    fn init(&mut self, init_data: Self::InitData) -> Result<(), Self::InitError> {
        let (params, drift_params) = init_data;
        params.validate()?;

        *self = Self::default();
        self.params = params;
        self.drift.set_params(&drift_params);

        Ok(())
    }

    /// Process an accepted GPS fix.
    ///
    /// The drift estimate is updated whether or not the stage is enabled. The
    /// output is the drift corrected desired heading, `None` while disabled or
    /// once the path is complete.
    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        let pos = input_data.position;
        if !pos.position.latitude.is_finite() || !pos.position.longitude.is_finite() {
            return Err(PathCtrlError::NonFinitePosition(
                pos.position.latitude,
                pos.position.longitude,
            ));
        }

        let mut report = StatusReport::default();

        if let (Some(compass), Some(course)) = (input_data.compass_heading_deg, pos.heading_deg) {
            self.drift.add(pos.time_s, compass, course);
            self.latest_drift = self.drift.estimate();
        }
        report.drift = self.latest_drift;

        if !self.enabled {
            report.waypoints_remaining = self.waypoints.len();
            return Ok((None, report));
        }

        // Pop every waypoint we're already within range of
        let mut distance_m = None;
        while let Some(target) = self.waypoints.front() {
            let d = geo::distance_between_points_m(&pos.position, target);
            if d < self.params.arrival_radius_m {
                info!(
                    "Waypoint ({:.6}, {:.6}) reached, {} remaining",
                    target.latitude,
                    target.longitude,
                    self.waypoints.len() - 1
                );
                self.waypoints.pop_front();
                report.waypoints_reached += 1;
            } else {
                distance_m = Some(d);
                break;
            }
        }

        let target = match self.waypoints.front() {
            Some(t) => *t,
            None => {
                info!("Path complete");
                self.enabled = false;
                self.heading_to_destination_deg = None;
                report.path_complete = true;
                return Ok((None, report));
            }
        };

        let bearing_deg = geo::calculate_bearing(&pos.position, &target);
        let drift_deg = self.latest_drift.map_or(0.0, |d| d.drift_deg);
        let desired_deg = geo::normalize_heading(bearing_deg + drift_deg);

        self.heading_to_destination_deg = Some(bearing_deg);

        debug!(
            "PathCtrl: {:.1} m to waypoint, bearing {:.1} deg, drift {:.1} deg",
            distance_m.unwrap_or(0.0),
            bearing_deg,
            drift_deg
        );

        report.enabled = true;
        report.waypoints_remaining = self.waypoints.len();
        report.distance_to_waypoint_m = distance_m;
        report.heading_to_destination_deg = Some(bearing_deg);

        Ok((Some(desired_deg), report))
    }
}

impl PathCtrl {
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Start following the waypoints.
    pub fn enable(&mut self) -> Result<(), PathCtrlError> {
        if self.waypoints.is_empty() {
            return Err(PathCtrlError::NoWaypoints);
        }
        if !self.enabled {
            info!("PathCtrl enabled with {} waypoints", self.waypoints.len());
        }
        self.enabled = true;
        Ok(())
    }

    /// Stop following the waypoints. They are kept for a later enable, but
    /// there is no destination until then.
    pub fn disable(&mut self) {
        if self.enabled {
            info!("PathCtrl disabled");
        }
        self.enabled = false;
        self.heading_to_destination_deg = None;
    }

    /// Replace the waypoint list. An empty list stops path following.
    pub fn set_waypoints(&mut self, waypoints: Vec<LatLon>) {
        info!("New path with {} waypoints", waypoints.len());
        self.waypoints = waypoints.into();
        if self.waypoints.is_empty() {
            self.disable();
        }
    }

    pub fn waypoints(&self) -> &VecDeque<LatLon> {
        &self.waypoints
    }

    /// Bearing to the current waypoint, without drift correction.
    pub fn heading_to_destination(&self) -> Option<f64> {
        self.heading_to_destination_deg
    }

    pub fn drift(&self) -> Option<&DriftEstimate> {
        self.latest_drift.as_ref()
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn set_params(&mut self, params: &Params, drift_params: &DriftParams) {
        self.params = params.clone();
        self.drift.set_params(drift_params);
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
