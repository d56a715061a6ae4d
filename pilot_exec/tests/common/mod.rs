//! Closed loop harness running the autopilot against the simulated boat

#![allow(dead_code)]

use comms_if::eqpt::LatLon;
use pilot_lib::{
    autopilot::Autopilot,
    motor::MotorDriver,
    params::PilotParams,
    pid::PidGains,
    sensors::{BoatModel, SensorEvent, SensorSource, SimBoat, SimParams, SimTiller},
};

/// Period at which the harness steps the loop.
pub const STEP_S: f64 = 0.05;

pub struct Harness {
    pub autopilot: Autopilot,
    pub boat: SimBoat,
    tiller: SimTiller,
    pub time_s: f64,
}

impl Harness {
    /// A quiet boat with gains known to hold a heading.
    pub fn new() -> Self {
        let mut params = PilotParams::default();
        params.rate.gains = PidGains::new(0.2, 0.0, 0.0);
        params.orientation.gains = PidGains::new(0.5, 0.0, 0.0);
        params.sim = SimParams {
            compass_noise_deg: 0.0,
            gps_noise_m: 0.0,
            ..Default::default()
        };

        Self::with_params(params)
    }

    pub fn with_params(params: PilotParams) -> Self {
        let boat = SimBoat::new(&params.sim);
        let tiller = boat.tiller();

        Self {
            autopilot: Autopilot::new(params).unwrap(),
            boat,
            tiller,
            time_s: 0.0,
        }
    }

    /// Run one loop period.
    pub fn step(&mut self) {
        self.time_s += STEP_S;

        for event in self.boat.poll(self.time_s) {
            match event {
                SensorEvent::Heading(h) => self.autopilot.on_heading(h),
                SensorEvent::Position(p) => self.autopilot.on_position(p),
            }
        }
        self.autopilot.poll(self.time_s);

        let dems = self.autopilot.motor_output().latest();
        self.tiller.send(&dems).unwrap();
    }

    pub fn run_for(&mut self, duration_s: f64) {
        let end_s = self.time_s + duration_s;
        while self.time_s < end_s {
            self.step();
        }
    }

    /// Run until `done` holds or `max_s` elapses. Returns true if `done` held.
    pub fn run_until<F: Fn(&Autopilot) -> bool>(&mut self, max_s: f64, done: F) -> bool {
        let end_s = self.time_s + max_s;
        while self.time_s < end_s {
            self.step();
            if done(&self.autopilot) {
                return true;
            }
        }
        false
    }

    pub fn model(&self) -> BoatModel {
        self.boat.model()
    }

    pub fn position(&self) -> LatLon {
        self.boat.model().position
    }
}
