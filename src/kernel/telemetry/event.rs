use serde::{Deserialize, Serialize};

use crate::route::GeoPoint;

// Timestamps are whole seconds since the recording session started.

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TelemetryEvent {
    /// `checkpoint_number` is one-based: checkpoint index 0 is stored as 1.
    CheckpointReached {
        checkpoint_number: usize,
        timestamp: u64,
    },

    LocationSample {
        point: GeoPoint,
        timestamp: u64,
    },

    HeartRateSample {
        bpm: u32,
        timestamp: u64,
    },
}

impl TelemetryEvent {
    pub fn timestamp(&self) -> u64 {
        match self {
            TelemetryEvent::CheckpointReached { timestamp, .. }
            | TelemetryEvent::LocationSample { timestamp, .. }
            | TelemetryEvent::HeartRateSample { timestamp, .. } => *timestamp,
        }
    }
}

/// One recorded traversal of a route. Immutable once built.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Telemetry {
    events: Vec<TelemetryEvent>,
}

impl Telemetry {
    pub fn new(events: Vec<TelemetryEvent>) -> Self {
        Self { events }
    }

    pub fn events(&self) -> &[TelemetryEvent] {
        &self.events
    }

    /// Latest timestamp in the log, 0 for an empty one.
    pub fn duration(&self) -> u64 {
        self.events.iter().map(TelemetryEvent::timestamp).max().unwrap_or(0)
    }

    /// Timestamp of the first `CheckpointReached` carrying `checkpoint_number`.
    pub fn checkpoint_reached(&self, checkpoint_number: usize) -> Option<u64> {
        self.events.iter().find_map(|event| match event {
            TelemetryEvent::CheckpointReached {
                checkpoint_number: n,
                timestamp,
            } if *n == checkpoint_number => Some(*timestamp),
            _ => None,
        })
    }
}
