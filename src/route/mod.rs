pub mod geo;
pub mod store;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, TrackerError};
use crate::kernel::telemetry::event::{Telemetry, TelemetryEvent};

pub use geo::GeoPoint;
pub use store::{InMemoryTelemetryStorage, JsonFileTelemetryStorage, TelemetryStorage};

/// A point of a route together with its zero-based position in it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    index: usize,
    point: GeoPoint,
}

impl Checkpoint {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn point(&self) -> GeoPoint {
        self.point
    }
}

/// An ordered, non-empty list of checkpoints plus the recorded runs over it.
pub struct Route {
    id: Uuid,
    name: String,
    checkpoints: Vec<Checkpoint>,
    storage: Arc<dyn TelemetryStorage>,
}

impl Route {
    pub fn new(
        name: impl Into<String>,
        points: Vec<GeoPoint>,
        storage: Arc<dyn TelemetryStorage>,
    ) -> Result<Self> {
        if points.is_empty() {
            return Err(TrackerError::invalid("a route needs at least one checkpoint"));
        }
        let checkpoints = points
            .into_iter()
            .enumerate()
            .map(|(index, point)| Checkpoint { index, point })
            .collect();
        Ok(Self {
            id: Uuid::new_v4(),
            name: name.into(),
            checkpoints,
            storage,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn checkpoints(&self) -> &[Checkpoint] {
        &self.checkpoints
    }

    pub fn checkpoint(&self, index: usize) -> Option<&Checkpoint> {
        self.checkpoints.get(index)
    }

    /// Number of checkpoints. Never zero.
    pub fn len(&self) -> usize {
        self.checkpoints.len()
    }

    pub fn is_last(&self, index: usize) -> bool {
        index + 1 == self.checkpoints.len()
    }

    pub fn telemetries(&self) -> Result<Vec<Telemetry>> {
        self.storage.telemetries()
    }

    pub fn create_telemetry(&self, events: Vec<TelemetryEvent>) -> Result<()> {
        self.storage.create_telemetry(Telemetry::new(events))
    }

    pub fn best_telemetry(&self) -> Result<Telemetry> {
        self.storage.best_telemetry()?.ok_or(TrackerError::NoBestTelemetry)
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("checkpoints", &self.checkpoints)
            .finish_non_exhaustive()
    }
}
