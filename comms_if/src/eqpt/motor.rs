//! # Tiller motor demands

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A power demand for the tiller motor.
#[derive(Debug, Default, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotorDems {
    /// Normalised motor power in the range [-1, 1].
    ///
    /// Positive power pushes the tiller to starboard, which turns the vessel
    /// to port.
    pub power: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Direction of the motor as understood by the tiller firmware.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MotorDirection {
    Left = 0,
    Right = 1,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl MotorDems {
    pub fn new(power: f64) -> Self {
        Self {
            power: power.max(-1.0).min(1.0),
        }
    }

    /// The demand that stops the motor.
    pub fn stop() -> Self {
        Self::default()
    }

    /// Encode the demand into the two byte `[level, direction]` frame accepted
    /// by the tiller firmware, where level is the power scaled into 0..=255.
    pub fn to_frame(&self) -> [u8; 2] {
        let power = self.power.max(-1.0).min(1.0);
        let level = (power.abs() * 255.0).round() as u8;
        let direction = if power > 0.0 {
            MotorDirection::Right
        } else {
            MotorDirection::Left
        };

        [level, direction as u8]
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_frame_encoding() {
        assert_eq!(MotorDems::new(1.0).to_frame(), [255, 1]);
        assert_eq!(MotorDems::new(-0.5).to_frame(), [128, 0]);
        assert_eq!(MotorDems::stop().to_frame(), [0, 0]);
        assert_eq!(MotorDems::new(7.0).power, 1.0);
    }
}
