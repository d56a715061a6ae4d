//! # Data Store

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{info, warn};

use comms_if::tc::Stage;

use crate::{
    autopilot::{Autopilot, AutopilotError, AutopilotStatus},
    motor::{MotorDriver, MotorSender},
    params::PilotParams,
    sensors::{SensorEvent, SensorSource, SourceProxy},
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Global data store for the executable.
pub struct DataStore {
    // Cycle management
    /// Number of cycles already executed
    pub num_cycles: u64,

    /// True if this cycle falls on a 1Hz boundary
    pub is_1_hz_cycle: bool,

    /// Session elapsed time, the time axis of every sample
    pub sim_time_s: f64,

    // Control
    pub autopilot: Autopilot,

    /// Status captured at the end of the last cycle
    pub status: AutopilotStatus,

    // Equipment
    pub sensors: SourceProxy,
    pub motor_sender: MotorSender,

    /// Driver used while the simulated boat is selected
    pub sim_motor: Box<dyn MotorDriver>,

    /// Driver used with the real sensors
    pub real_motor: Box<dyn MotorDriver>,

    // Monitoring Counters
    /// Number of consecutive cycle overruns
    pub num_consec_cycle_overruns: u64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl DataStore {
    pub fn new(
        autopilot: Autopilot,
        sensors: SourceProxy,
        sim_motor: Box<dyn MotorDriver>,
        real_motor: Box<dyn MotorDriver>,
    ) -> Self {
        let motor_sender = MotorSender::new(&autopilot.params().motor);

        Self {
            num_cycles: 0,
            is_1_hz_cycle: false,
            sim_time_s: 0.0,
            status: autopilot.status(),
            autopilot,
            sensors,
            motor_sender,
            sim_motor,
            real_motor,
            num_consec_cycle_overruns: 0,
        }
    }

    /// Perform actions required at the start of a cycle.
    ///
    /// Sets the 1Hz cycle flag and reads the session clock.
    pub fn cycle_start(&mut self, cycle_frequency_hz: f64) {
        self.is_1_hz_cycle = self.num_cycles % (cycle_frequency_hz as u64).max(1) == 0;
        self.sim_time_s = util::session::get_elapsed_seconds();
    }

    /// Feed every sensor sample produced up to `now_s` to the autopilot,
    /// then bring the autopilot's clock up to date.
    pub fn process_sensors(&mut self, now_s: f64) {
        for event in self.sensors.poll(now_s) {
            match event {
                SensorEvent::Heading(h) => self.autopilot.on_heading(h),
                SensorEvent::Position(p) => self.autopilot.on_position(p),
            }
        }

        self.autopilot.poll(now_s);
    }

    /// Deliver the latest motor command to the driver of the active source if
    /// a send is due.
    pub fn send_motor(&mut self, now_s: f64) {
        let driver = if self.sensors.simulation() {
            self.sim_motor.as_mut()
        } else {
            self.real_motor.as_mut()
        };

        self.motor_sender
            .send_due(now_s, self.autopilot.motor_output_mut(), driver);
    }

    /// Perform actions required at the end of a cycle.
    pub fn cycle_end(&mut self) {
        self.status = self.autopilot.status();
        self.num_cycles += 1;
    }

    /// Select the simulated or real sensors and motor.
    pub fn set_simulation(&mut self, simulation: bool) {
        if simulation != self.sensors.simulation() {
            // The new motor starts from neutral
            self.autopilot.motor_output_mut().stop();
        }
        self.sensors.set_simulation(simulation);
    }

    /// Install a new parameter set across the autopilot and motor sender.
    pub fn set_params(&mut self, params: PilotParams) -> Result<(), AutopilotError> {
        let motor = params.motor.clone();
        self.autopilot.set_params(params)?;
        self.motor_sender.set_params(&motor);
        Ok(())
    }

    /// Leave every automatic mode and deliver a neutral motor command
    /// straight away, used on shutdown.
    pub fn stop_all(&mut self) {
        self.autopilot.stop_manually();
        self.autopilot.disable(Stage::RotationRate);
        self.autopilot.motor_output_mut().stop();

        // Past the send period so the neutral goes out now
        let stop_s = self.autopilot.now_s() + self.autopilot.params().motor.send_period_s;
        self.send_motor(stop_s);
    }

    /// Log a one line summary of the last cycle's status.
    pub fn log_status(&self) {
        let s = &self.status;

        info!(
            "t={:.1} s | path {} ({} wp) | orient {}{} -> {:.1} deg | rate {}{} -> {:.2} dps | \
            heading {} | power {:.2}{}",
            s.time_s,
            on_off(s.path_enabled),
            s.waypoints_remaining,
            on_off(s.orientation_enabled),
            if s.orientation_tuning { " (tuning)" } else { "" },
            s.desired_heading_deg,
            on_off(s.rotation_rate_enabled),
            if s.rotation_rate_tuning { " (tuning)" } else { "" },
            s.desired_rate_dps,
            s.filtered_heading_deg
                .map_or(String::from("-"), |h| format!("{:.1} deg", h)),
            s.motor_power,
            if s.motor_connected { "" } else { " (not connected)" },
        );

        if s.path_enabled {
            if let (Some(d), Some(b)) = (s.distance_to_waypoint_m, s.heading_to_destination_deg) {
                info!(
                    "    {:.1} m to waypoint on {:.1} deg, drift {}",
                    d,
                    b,
                    s.drift_deg.map_or(String::from("-"), |d| format!("{:.1} deg", d))
                );
            }
        }

        if s.time_s > 0.0 && !s.motor_connected && s.rotation_rate_enabled {
            warn!("Rate control is running but the motor is not connected");
        }
    }
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "on"
    } else {
        "off"
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
