//! # Telecommand module
//!
//! This module provides the telecommands used to drive the pilot, either from
//! a timed script or from a remote operator. Telecommands are JSON objects of
//! the form
//!
//! ```text
//! {"type": "HEADING", "payload": 90.0}
//! ```
//!
//! where the payload is omitted for commands that carry no data.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Serialize, Deserialize};
use serde_json::{self, Value};
use thiserror::Error;

// Internal
use crate::eqpt::LatLon;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Type strings of telecommands which carry no payload.
const TYPE_HAS_NO_PAYLOAD: [&str; 2] = [
    "MAINTAIN",
    "STOP"
];

/// Type strings of telecommands which carry a payload.
const TYPE_HAS_PAYLOAD: [&str; 12] = [
    "WAYPOINTS",
    "HEADING",
    "RATE",
    "ENABLE",
    "DISABLE",
    "TUNE",
    "CANCEL_TUNE",
    "OFFSET",
    "MANUAL",
    "PARAMS",
    "SIM",
    "SAVED_GAINS"
];

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// A telecommand, i.e. an instruction sent to the pilot by the operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum Tc {
    /// Replace the waypoint list of the path stage. An empty list clears the
    /// path.
    #[serde(rename = "WAYPOINTS")]
    SetWaypoints(Vec<LatLon>),

    /// Set the desired heading of the orientation stage, in degrees.
    #[serde(rename = "HEADING")]
    SetDesiredHeading(f64),

    /// Set the desired rotation rate, in degrees/second.
    #[serde(rename = "RATE")]
    SetDesiredRotationRate(f64),

    #[serde(rename = "ENABLE")]
    Enable(Stage),

    #[serde(rename = "DISABLE")]
    Disable(Stage),

    /// Start a relay auto-tune session on the given stage.
    #[serde(rename = "TUNE")]
    StartAutotune(Stage),

    #[serde(rename = "CANCEL_TUNE")]
    CancelAutotune(Stage),

    /// Hold the current heading.
    #[serde(rename = "MAINTAIN")]
    MaintainHeading,

    /// Hold the current heading offset by the given number of degrees.
    #[serde(rename = "OFFSET")]
    OffsetHeading(f64),

    /// Manual nudge, positive levels turn to port.
    #[serde(rename = "MANUAL")]
    ManualMove(f64),

    #[serde(rename = "STOP")]
    ManualStop,

    /// A complete parameter set to hot-reload. Validated by the receiver.
    #[serde(rename = "PARAMS")]
    SetParams(Value),

    /// Switch between the simulated boat and the real sensors.
    #[serde(rename = "SIM")]
    SetSimulation(bool),

    /// Apply the saved gain preset with the given title to its stage.
    #[serde(rename = "SAVED_GAINS")]
    ApplySavedGains(String),
}

/// The stages of the control cascade.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    Path,
    Orientation,
    RotationRate
}

/// Possible parsing errors.
#[derive(Debug, Error)]
pub enum TcParseError {
    #[error("TC contains invalid JSON: {0}")]
    InvalidJson(serde_json::Error),

    #[error("TC has an invalid type ({0})")]
    InvalidType(String),

    #[error("TC of type {0} is expected to have a payload but it doesn't")]
    MissingPayload(String),

    #[error("TC of type {0} has an invalid payload: {1}")]
    InvalidPayload(String, serde_json::Error)
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Tc {

    /// Parse a new TC from a JSON packet
    pub fn from_json(json_str: &str) -> Result<Self, TcParseError> {
        // Parse the JSON string into a value
        let mut val: Value = serde_json::from_str(json_str)
            .map_err(TcParseError::InvalidJson)?;

        // Get the type of the TC
        let tc_type = match val["type"].as_str() {
            Some(s) => s.to_string(),
            None => return Err(TcParseError::InvalidType(String::from(
                "Expected \"type\" to be a string"
            )))
        };

        let has_payload = if TYPE_HAS_PAYLOAD.contains(&tc_type.as_str()) {
            true
        }
        else if TYPE_HAS_NO_PAYLOAD.contains(&tc_type.as_str()) {
            false
        }
        else {
            return Err(TcParseError::InvalidType(
                format!("{} is not a recognised TC type", tc_type)
            ))
        };

        // Get the payload. If it's null and the type has a payload then an
        // error is returned. Unit variants must not carry a payload key at
        // all, so strip any null one the sender included.
        if has_payload && val["payload"].is_null() {
            return Err(TcParseError::MissingPayload(tc_type))
        }
        if !has_payload {
            if let Some(obj) = val.as_object_mut() {
                obj.remove("payload");
            }
        }

        serde_json::from_value(val)
            .map_err(|e| TcParseError::InvalidPayload(tc_type, e))
    }

    /// Serialise the TC into the JSON form accepted by `from_json`.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Path => "path",
            Stage::Orientation => "orientation",
            Stage::RotationRate => "rotation rate"
        };
        write!(f, "{}", name)
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
