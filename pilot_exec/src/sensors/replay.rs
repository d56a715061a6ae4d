//! Replay of recorded sensor logs
//!
//! Logs are CSV files with the header
//! `kind,time_s,heading_deg,latitude,longitude,accuracy_m`, where `kind` is
//! one of `heading`, `position` or `no_fix`. Fields not used by a kind may be
//! left empty. Times are rebased so the first record plays at zero.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::{io::Read, path::Path};

use log::info;
use serde::Deserialize;
use thiserror::Error;

use comms_if::eqpt::{HeadingSample, LatLon, PositionSample};

use super::{SensorEvent, SensorSource};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// One row of a sensor log.
#[derive(Debug, Deserialize)]
struct Record {
    kind: String,
    time_s: f64,
    heading_deg: Option<f64>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    accuracy_m: Option<f64>,
}

/// Replays a recorded sensor log against the pilot's clock.
#[derive(Debug, Clone)]
pub struct ReplaySource {
    events: Vec<(f64, SensorEvent)>,
    next: usize,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("Could not read the log: {0}")]
    Csv(#[from] csv::Error),

    #[error("Unknown record kind \"{1}\" on line {0}")]
    UnknownKind(usize, String),

    #[error("Record on line {0} is missing the {1} field")]
    MissingField(usize, &'static str),

    #[error("Record on line {0} is earlier than the one before it")]
    OutOfOrder(usize),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ReplaySource {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ReplayError> {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path.as_ref())?;
        let source = Self::from_csv(reader)?;

        info!(
            "Loaded {} sensor records from {:?} ({:.1} s)",
            source.events.len(),
            path.as_ref(),
            source.duration_s()
        );

        Ok(source)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ReplayError> {
        Self::from_csv(csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader))
    }

    fn from_csv<R: Read>(mut reader: csv::Reader<R>) -> Result<Self, ReplayError> {
        let mut events = Vec::new();
        let mut t0 = None;
        let mut prev_s = f64::NEG_INFINITY;

        for (i, record) in reader.deserialize::<Record>().enumerate() {
            // Header is line 1
            let line = i + 2;
            let r = record?;

            if r.time_s < prev_s {
                return Err(ReplayError::OutOfOrder(line));
            }
            prev_s = r.time_s;

            let t0 = *t0.get_or_insert(r.time_s);
            let time_s = r.time_s - t0;

            let event = match r.kind.as_str() {
                "heading" => SensorEvent::Heading(HeadingSample::new(
                    r.heading_deg.ok_or(ReplayError::MissingField(line, "heading_deg"))?,
                    time_s,
                )),
                "position" => SensorEvent::Position(Some(PositionSample::raw(
                    LatLon::new(
                        r.latitude.ok_or(ReplayError::MissingField(line, "latitude"))?,
                        r.longitude.ok_or(ReplayError::MissingField(line, "longitude"))?,
                    ),
                    r.accuracy_m.ok_or(ReplayError::MissingField(line, "accuracy_m"))?,
                    time_s,
                ))),
                "no_fix" => SensorEvent::Position(None),
                k => return Err(ReplayError::UnknownKind(line, k.to_string())),
            };

            events.push((time_s, event));
        }

        Ok(Self { events, next: 0 })
    }

    /// Time of the last record.
    pub fn duration_s(&self) -> f64 {
        self.events.last().map_or(0.0, |(t, _)| *t)
    }

    pub fn is_finished(&self) -> bool {
        self.next >= self.events.len()
    }
}

impl SensorSource for ReplaySource {
    fn poll(&mut self, now_s: f64) -> Vec<SensorEvent> {
        let start = self.next;
        while self.next < self.events.len() && self.events[self.next].0 <= now_s {
            self.next += 1;
        }

        self.events[start..self.next].iter().map(|(_, e)| *e).collect()
    }

    fn reset(&mut self) {
        self.next = 0;
    }

    fn name(&self) -> &'static str {
        "replay"
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
