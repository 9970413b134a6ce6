use std::sync::Arc;

use tracing::info;

use crate::config::TrackerConfig;
use crate::error::Result;
use crate::kernel::checkpoint::CheckpointCrossing;
use crate::kernel::crossing::TrackCrossing;
use crate::kernel::telemetry::recorder::TelemetrySession;
use crate::kernel::trigger::LocationReachedTrigger;
use crate::route::Route;
use crate::sensors::SensorHub;

/// The assembled tracker: a proximity trigger driving a track crossing,
/// with a telemetry session listening to the crossing.
pub struct Tracker {
    trigger: Arc<LocationReachedTrigger>,
    crossing: Arc<TrackCrossing>,
    telemetry: Arc<TelemetrySession>,
}

impl Tracker {
    pub fn new(hub: &SensorHub, config: &TrackerConfig) -> Result<Self> {
        config.validate()?;
        let trigger = LocationReachedTrigger::new(
            Arc::clone(&hub.scheduler),
            Arc::clone(&hub.location),
            config.location_poll_interval(),
            config.location_read_timeout(),
            config.proximity_radius_m,
        )?;
        let crossing = TrackCrossing::new(Arc::clone(&trigger), Arc::clone(&hub.clock));
        let telemetry = TelemetrySession::new(
            Arc::clone(&crossing),
            hub.clone(),
            config.sampling_interval(),
            config.sensor_read_timeout(),
        );
        info!(radius_m = config.proximity_radius_m, "tracker assembled");
        Ok(Self {
            trigger,
            crossing,
            telemetry,
        })
    }

    /// Records a fresh telemetry of `route` and starts crossing it.
    pub fn start_recorded(&self, route: Arc<Route>) -> Result<()> {
        self.telemetry.enable()?;
        self.crossing.start_track(route)
    }

    pub fn last_crossed(&self) -> Result<CheckpointCrossing> {
        self.crossing.get_last_crossed()
    }

    pub fn trigger(&self) -> &Arc<LocationReachedTrigger> {
        &self.trigger
    }

    pub fn crossing(&self) -> &Arc<TrackCrossing> {
        &self.crossing
    }

    pub fn telemetry(&self) -> &Arc<TelemetrySession> {
        &self.telemetry
    }
}
