//! Simulated tiller boat
//!
//! A simple kinematic model: the motor slews the tiller, the tiller angle sets
//! the rotation rate in proportion to speed, and the boat moves at constant
//! speed along its heading. The compass reads the true heading plus a fixed
//! drift and Perlin noise, and GPS fixes are jittered by Perlin noise.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::{cell::RefCell, rc::Rc};

use log::{debug, info};
use noise::{NoiseFn, Perlin, Seedable};

use comms_if::eqpt::{HeadingSample, LatLon, MotorDems, PositionSample};

use super::{SensorEvent, SensorSource, SimParams};
use crate::{
    motor::{MotorDriver, MotorError},
    nav::geo,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Longest step of the physics integration.
///
/// Units: seconds
const MAX_STEP_S: f64 = 0.02;

/// Rate at which the noise field is traversed.
///
/// Units: 1/seconds
const NOISE_FREQUENCY_HZ: f64 = 0.37;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Physical state of the simulated boat.
#[derive(Debug, Clone)]
pub struct BoatModel {
    params: SimParams,

    pub position: LatLon,

    /// True heading
    ///
    /// Units: degrees
    pub heading_deg: f64,

    /// Units: degrees, positive to starboard
    pub tiller_deg: f64,

    /// Motor power currently applied
    pub power: f64,

    /// Units: seconds
    pub time_s: f64,
}

/// Simulated boat sensor source.
pub struct SimBoat {
    model: Rc<RefCell<BoatModel>>,
    perlin: Perlin,

    next_compass_s: f64,
    next_gps_s: f64,
}

/// The simulated boat's tiller motor.
pub struct SimTiller {
    model: Rc<RefCell<BoatModel>>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl BoatModel {
    pub fn new(params: &SimParams) -> Self {
        Self {
            params: params.clone(),
            position: LatLon::new(params.start_latitude, params.start_longitude),
            heading_deg: geo::normalize_heading(params.start_heading_deg),
            tiller_deg: 0.0,
            power: 0.0,
            time_s: 0.0,
        }
    }

    /// Rotation rate, positive clockwise.
    ///
    /// Units: degrees/second
    pub fn rotation_rate_dps(&self) -> f64 {
        -self.tiller_deg * self.params.turn_rate_gain * self.params.speed_kts
    }

    /// Advance the model by `dt` seconds.
    pub fn step(&mut self, dt: f64) {
        if dt <= 0.0 {
            return;
        }

        let max = self.params.max_tiller_deg;
        self.tiller_deg = (self.tiller_deg + self.power * self.params.tiller_rate_dps * dt)
            .max(-max)
            .min(max);

        self.heading_deg = geo::normalize_heading(self.heading_deg + self.rotation_rate_dps() * dt);

        let speed_mps = geo::knots_to_mps(self.params.speed_kts);
        self.position = geo::calculate_new_position(&self.position, speed_mps * dt, self.heading_deg);

        self.time_s += dt;
    }

    /// Advance the model to `time_s` in steps no longer than the maximum.
    pub fn advance_to(&mut self, time_s: f64) {
        while self.time_s < time_s {
            let dt = (time_s - self.time_s).min(MAX_STEP_S);
            self.step(dt);
        }
    }
}

impl SimBoat {
    pub fn new(params: &SimParams) -> Self {
        info!(
            "Simulated boat at ({:.5}, {:.5}), {:.1} kts",
            params.start_latitude, params.start_longitude, params.speed_kts
        );

        Self {
            model: Rc::new(RefCell::new(BoatModel::new(params))),
            perlin: Perlin::new().set_seed(params.seed),
            next_compass_s: 0.0,
            next_gps_s: 0.0,
        }
    }

    /// Get a motor driver acting on this boat's tiller.
    pub fn tiller(&self) -> SimTiller {
        SimTiller {
            model: Rc::clone(&self.model),
        }
    }

    /// A snapshot of the boat's true state.
    pub fn model(&self) -> BoatModel {
        self.model.borrow().clone()
    }

    /// Noise in [-1, 1] on one of several independent channels.
    fn noise(&self, channel: f64, time_s: f64) -> f64 {
        self.perlin
            .get([time_s * NOISE_FREQUENCY_HZ + 0.5, channel * 10.0 + 0.5])
            .max(-1.0)
            .min(1.0)
    }

    fn compass_sample(&self, model: &BoatModel) -> HeadingSample {
        let noise_deg = model.params.compass_noise_deg * self.noise(0.0, model.time_s);
        HeadingSample::new(
            geo::normalize_heading(model.heading_deg + model.params.compass_drift_deg + noise_deg),
            model.time_s,
        )
    }

    fn gps_sample(&self, model: &BoatModel) -> PositionSample {
        let p = &model.params;
        let north_m = p.gps_noise_m * self.noise(1.0, model.time_s);
        let east_m = p.gps_noise_m * self.noise(2.0, model.time_s);

        let position = geo::calculate_new_position(&model.position, north_m, 0.0);
        let position = geo::calculate_new_position(&position, east_m, 90.0);

        PositionSample::raw(position, p.gps_accuracy_m, model.time_s)
    }
}

impl SensorSource for SimBoat {
    fn poll(&mut self, now_s: f64) -> Vec<SensorEvent> {
        let mut events = Vec::new();
        let (compass_period_s, gps_period_s) = {
            let m = self.model.borrow();
            (m.params.compass_period_s, m.params.gps_period_s)
        };

        // Step the model to each sample time in turn
        loop {
            let next_s = self.next_compass_s.min(self.next_gps_s);
            if next_s > now_s {
                break;
            }

            self.model.borrow_mut().advance_to(next_s);
            let model = self.model.borrow().clone();

            if self.next_compass_s <= next_s {
                events.push(SensorEvent::Heading(self.compass_sample(&model)));
                self.next_compass_s += compass_period_s;
            }
            if self.next_gps_s <= next_s {
                events.push(SensorEvent::Position(Some(self.gps_sample(&model))));
                self.next_gps_s += gps_period_s;
            }
        }

        self.model.borrow_mut().advance_to(now_s);

        events
    }

    fn reset(&mut self) {
        let mut model = self.model.borrow_mut();
        debug!("Simulated boat reset at {:.3} s", model.time_s);

        // Samples restart from the current time, the boat keeps its state
        self.next_compass_s = model.time_s;
        self.next_gps_s = model.time_s;
        model.power = 0.0;
    }

    fn name(&self) -> &'static str {
        "simulation"
    }
}

impl MotorDriver for SimTiller {
    fn send(&mut self, dems: &MotorDems) -> Result<(), MotorError> {
        self.model.borrow_mut().power = dems.power;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn quiet() -> SimParams {
        SimParams {
            compass_noise_deg: 0.0,
            gps_noise_m: 0.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_sample_cadence() {
        let mut boat = SimBoat::new(&quiet());
        let events = boat.poll(1.0);

        let headings = events
            .iter()
            .filter(|e| matches!(e, SensorEvent::Heading(_)))
            .count();
        let fixes = events
            .iter()
            .filter(|e| matches!(e, SensorEvent::Position(Some(_))))
            .count();

        // 0.0 to 1.0 s inclusive, allowing for rounding of the last sample
        assert!(headings == 10 || headings == 11, "{} headings", headings);
        assert_eq!(fixes, 2);
    }

    #[test]
    fn test_compass_reads_drift() {
        let mut boat = SimBoat::new(&quiet());
        match boat.poll(0.0)[0] {
            SensorEvent::Heading(h) => assert_abs_diff_eq!(h.heading_deg, 30.0, epsilon = 1e-9),
            e => panic!("Unexpected first event {:?}", e),
        }
    }

    #[test]
    fn test_straight_line_speed() {
        let mut boat = SimBoat::new(&quiet());
        let start = boat.model().position;
        boat.poll(100.0);

        let d = geo::distance_between_points_m(&start, &boat.model().position);
        assert_abs_diff_eq!(d, 100.0 * geo::knots_to_mps(3.0), epsilon = 0.1);
    }

    #[test]
    fn test_positive_power_turns_counterclockwise() {
        let mut boat = SimBoat::new(&quiet());
        let mut tiller = boat.tiller();

        tiller.send(&MotorDems::new(0.5)).unwrap();
        boat.poll(2.0);

        let model = boat.model();
        assert_abs_diff_eq!(model.tiller_deg, 20.0, epsilon = 1e-6);
        assert!(model.rotation_rate_dps() < 0.0);
        assert!(geo::normalize_delta(model.heading_deg) < 0.0);
    }

    #[test]
    fn test_noise_is_bounded() {
        let params = SimParams::default();
        let mut boat = SimBoat::new(&params);

        for e in boat.poll(60.0) {
            if let SensorEvent::Heading(h) = e {
                let err = geo::normalize_delta(h.heading_deg - 30.0);
                assert!(err.abs() <= params.compass_noise_deg + 1e-9);
            }
        }
    }
}
