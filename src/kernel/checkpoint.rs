use std::sync::Arc;

use crate::error::{Result, TrackerError};
use crate::route::Route;

/// How one crossed checkpoint compares with the route's best run.
#[derive(Debug, Clone)]
pub struct CheckpointCrossing {
    index: usize,
    partial_time: u64,
    route: Arc<Route>,
}

impl CheckpointCrossing {
    pub fn new(checkpoint_index: usize, partial_time: u64, route: Arc<Route>) -> Result<Self> {
        if checkpoint_index >= route.len() {
            return Err(TrackerError::invalid(format!(
                "checkpoint {checkpoint_index} is outside a route of {}",
                route.len()
            )));
        }
        Ok(Self {
            index: checkpoint_index,
            partial_time,
            route,
        })
    }

    pub fn checkpoint_index(&self) -> usize {
        self.index
    }

    /// Seconds from the start of the track to this checkpoint.
    pub fn partial_time(&self) -> u64 {
        self.partial_time
    }

    pub fn route(&self) -> &Arc<Route> {
        &self.route
    }

    /// Seconds behind (positive) or ahead of (negative) the best run at this
    /// checkpoint. Stored checkpoint numbers are one-based.
    pub fn delta(&self) -> Result<i64> {
        let best = self.route.best_telemetry()?;
        let number = self.index + 1;
        let reference = best
            .checkpoint_reached(number)
            .ok_or(TrackerError::NoMatchingEvent(number))?;
        Ok(self.partial_time as i64 - reference as i64)
    }
}
