//! # Motor output module
//!
//! The cascade computes motor power far more often than the tiller link can
//! carry it, so the core only keeps the latest command in [`MotorOutput`] and
//! a [`MotorSender`] delivers it to the [`MotorDriver`] at the link's own
//! cadence.
//!
//! Stopping a stage doesn't cut the motor straight away, a neutral command is
//! scheduled after a short grace period and cancelled if the stage comes back
//! before then.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use comms_if::eqpt::MotorDems;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Motor output parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotorParams {
    /// Time between commands sent to the motor.
    ///
    /// Units: seconds
    pub send_period_s: f64,

    /// Delay between a stage being disabled and the motor being set to
    /// neutral.
    ///
    /// Units: seconds
    pub disable_grace_s: f64,
}

/// The latest motor command and link state.
#[derive(Debug, Clone, Default)]
pub struct MotorOutput {
    latest: MotorDems,

    /// Time at which the motor will be set to neutral.
    neutral_due_s: Option<f64>,

    /// Whether the last send reached the motor.
    connected: bool,
}

/// Rate limited delivery of the latest command to a driver.
#[derive(Debug, Clone)]
pub struct MotorSender {
    send_period_s: f64,
    last_sent_s: Option<f64>,
}

/// A driver which only logs the frames it would send.
#[derive(Debug, Default)]
pub struct LogDriver {
    pub num_sent: usize,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum MotorError {
    #[error("The motor is not connected")]
    NotConnected,

    #[error("The motor rejected the command: {0}")]
    Rejected(String),
}

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Transport to the tiller motor.
pub trait MotorDriver {
    fn send(&mut self, dems: &MotorDems) -> Result<(), MotorError>;
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for MotorParams {
    fn default() -> Self {
        Self {
            send_period_s: 0.2,
            disable_grace_s: 0.1,
        }
    }
}

impl MotorOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the latest power command, limited to [-1, 1].
    pub fn command(&mut self, power: f64) {
        self.latest = MotorDems::new(power);
    }

    /// Set the motor to neutral at `due_s`, unless a neutral is already
    /// pending.
    pub fn schedule_neutral(&mut self, due_s: f64) {
        if self.neutral_due_s.is_none() {
            debug!("Motor neutral scheduled for {:.3} s", due_s);
            self.neutral_due_s = Some(due_s);
        }
    }

    pub fn cancel_neutral(&mut self) {
        if self.neutral_due_s.take().is_some() {
            debug!("Pending motor neutral cancelled");
        }
    }

    pub fn neutral_pending(&self) -> bool {
        self.neutral_due_s.is_some()
    }

    /// Apply a pending neutral once it's due. Returns true if it was applied.
    pub fn poll(&mut self, now_s: f64) -> bool {
        match self.neutral_due_s {
            Some(due) if now_s >= due => {
                info!("Motor set to neutral");
                self.neutral_due_s = None;
                self.latest = MotorDems::stop();
                true
            }
            _ => false,
        }
    }

    /// Stop the motor immediately.
    pub fn stop(&mut self) {
        self.neutral_due_s = None;
        self.latest = MotorDems::stop();
    }

    pub fn latest(&self) -> MotorDems {
        self.latest
    }

    pub fn power(&self) -> f64 {
        self.latest.power
    }

    pub fn connected(&self) -> bool {
        self.connected
    }

    pub fn set_connected(&mut self, connected: bool) {
        if connected != self.connected {
            if connected {
                info!("Motor connected");
            } else {
                warn!("Motor disconnected");
            }
        }
        self.connected = connected;
    }
}

impl MotorSender {
    pub fn new(params: &MotorParams) -> Self {
        Self {
            send_period_s: params.send_period_s,
            last_sent_s: None,
        }
    }

    pub fn set_params(&mut self, params: &MotorParams) {
        self.send_period_s = params.send_period_s;
    }

    /// Send the latest command if a send period has passed since the last
    /// one. Returns true if a send was attempted.
    ///
    /// The outcome of the send is recorded as the output's connection state.
    pub fn send_due(
        &mut self,
        now_s: f64,
        output: &mut MotorOutput,
        driver: &mut dyn MotorDriver,
    ) -> bool {
        if let Some(last) = self.last_sent_s {
            if now_s - last < self.send_period_s {
                return false;
            }
        }
        self.last_sent_s = Some(now_s);

        match driver.send(&output.latest()) {
            Ok(()) => output.set_connected(true),
            Err(e) => {
                debug!("Motor send failed: {}", e);
                output.set_connected(false);
            }
        }

        true
    }
}

impl MotorDriver for LogDriver {
    fn send(&mut self, dems: &MotorDems) -> Result<(), MotorError> {
        self.num_sent += 1;
        debug!("Motor frame {:?} (power {:.3})", dems.to_frame(), dems.power);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        sent: Vec<f64>,
        fail: bool,
    }

    impl MotorDriver for Recorder {
        fn send(&mut self, dems: &MotorDems) -> Result<(), MotorError> {
            if self.fail {
                return Err(MotorError::NotConnected);
            }
            self.sent.push(dems.power);
            Ok(())
        }
    }

    #[test]
    fn test_neutral_after_grace() {
        let mut out = MotorOutput::new();
        out.command(0.7);
        out.schedule_neutral(1.1);

        assert!(!out.poll(1.05));
        assert_eq!(out.power(), 0.7);

        assert!(out.poll(1.1));
        assert_eq!(out.power(), 0.0);
        assert!(!out.neutral_pending());
    }

    #[test]
    fn test_cancelled_neutral_never_applies() {
        let mut out = MotorOutput::new();
        out.command(-0.4);
        out.schedule_neutral(1.0);
        out.cancel_neutral();

        assert!(!out.poll(5.0));
        assert_eq!(out.power(), -0.4);
    }

    #[test]
    fn test_command_is_limited() {
        let mut out = MotorOutput::new();
        out.command(3.0);
        assert_eq!(out.power(), 1.0);
    }

    #[test]
    fn test_sender_rate_limits_and_sends_latest() {
        let mut sender = MotorSender::new(&MotorParams::default());
        let mut out = MotorOutput::new();
        let mut driver = Recorder::default();

        for i in 0..10 {
            let t = i as f64 * 0.05;
            out.command(t);
            sender.send_due(t, &mut out, &mut driver);
        }

        // Sends at 0.0, 0.2 and 0.4 s, each with the latest value
        assert_eq!(driver.sent.len(), 3);
        assert_eq!(driver.sent[0], 0.0);
        assert!((driver.sent[1] - 0.2).abs() < 1e-9);
        assert!(out.connected());

        driver.fail = true;
        assert!(sender.send_due(10.0, &mut out, &mut driver));
        assert!(!out.connected());
    }
}
