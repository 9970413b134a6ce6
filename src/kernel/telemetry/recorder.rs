use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tracing::{debug, info, warn};

use super::event::TelemetryEvent;
use crate::error::{Result, TrackerError};
use crate::kernel::crossing::{TrackCrossing, TrackCrossingObserver};
use crate::kernel::event::ObserverId;
use crate::kernel::scheduler::WakeupObserver;
use crate::route::GeoPoint;
use crate::sensors::{HeartRateObserver, LocationObserver, SensorHub};

pub const LOCATION_LOCK: &str = "LocationTelemetryLock";
pub const HEART_RATE_LOCK: &str = "HeartRateTelemetryLock";

#[derive(Debug, Default)]
struct Recording {
    enabled: bool,
    sampling: bool,
    started_at: Option<u64>,
    events: Vec<TelemetryEvent>,
}

impl Recording {
    fn elapsed(&self, now: u64) -> u64 {
        self.started_at.map_or(0, |start| now.saturating_sub(start))
    }
}

/// Records one traversal: checkpoint crossings as they happen plus
/// location and heart-rate samples on a fixed cadence once the first
/// checkpoint is crossed. Crossing the last checkpoint persists the log as
/// a new telemetry of the route.
pub struct TelemetrySession {
    me: Weak<TelemetrySession>,
    id: ObserverId,
    crossing: Arc<TrackCrossing>,
    hub: SensorHub,
    sampling_interval: Duration,
    read_timeout: Duration,
    recording: Mutex<Recording>,
}

impl TelemetrySession {
    /// Builds a disabled session listening to `crossing`.
    pub fn new(
        crossing: Arc<TrackCrossing>,
        hub: SensorHub,
        sampling_interval: Duration,
        read_timeout: Duration,
    ) -> Arc<Self> {
        let session = Arc::new_cyclic(|me| Self {
            me: me.clone(),
            id: ObserverId::new(),
            crossing: Arc::clone(&crossing),
            hub,
            sampling_interval,
            read_timeout,
            recording: Mutex::new(Recording::default()),
        });
        let observer: Arc<dyn TrackCrossingObserver> = session.clone();
        crossing.attach_observer(&observer);
        session
    }

    /// Arms recording and clears the previous log. Only legal before the
    /// first checkpoint is crossed.
    pub fn enable(&self) -> Result<()> {
        match self.crossing.get_next_checkpoint() {
            Ok(0) | Err(TrackerError::NoActiveRoute) | Err(TrackerError::RouteEnded) => {}
            Ok(_) => return Err(TrackerError::TrackAlreadyStarted),
            Err(e) => return Err(e),
        }
        let mut recording = self.lock();
        recording.enabled = true;
        recording.started_at = None;
        recording.events.clear();
        debug!(session = %self.id, "telemetry enabled");
        Ok(())
    }

    /// Stops recording. The log stays readable until the next `enable`.
    pub fn disable(&self) {
        let was_sampling = {
            let mut recording = self.lock();
            recording.enabled = false;
            std::mem::replace(&mut recording.sampling, false)
        };
        if was_sampling {
            self.stop_sampling();
        }
        debug!(session = %self.id, "telemetry disabled");
    }

    /// Snapshot of the log; later recording never changes it.
    pub fn events(&self) -> Vec<TelemetryEvent> {
        self.lock().events.clone()
    }

    pub fn is_enabled(&self) -> bool {
        self.lock().enabled
    }

    pub fn is_sampling(&self) -> bool {
        self.lock().sampling
    }

    pub fn observer_id(&self) -> ObserverId {
        self.id
    }

    /// Appends a sample stamped with the session's elapsed time, unless
    /// recording is off.
    fn record(&self, event: impl FnOnce(u64) -> TelemetryEvent) {
        let now = self.hub.clock.now_secs();
        let mut recording = self.lock();
        if recording.enabled {
            let elapsed = recording.elapsed(now);
            recording.events.push(event(elapsed));
        }
    }

    fn start_sampling(&self, recording: &mut Recording) {
        let Some(me) = self.me.upgrade() else {
            return;
        };
        match self.hub.scheduler.attach(me, self.sampling_interval, false) {
            Ok(_) => recording.sampling = true,
            Err(e) => warn!(session = %self.id, error = %e, "could not start sampling"),
        }
    }

    fn stop_sampling(&self) {
        if let Err(e) = self.hub.scheduler.detach(self.id) {
            debug!(session = %self.id, error = %e, "sampling wakeup already gone");
        }
    }

    fn release(&self, lock: &str) {
        if let Err(e) = self.hub.power.unlock(lock) {
            warn!(session = %self.id, error = %e, "power lock release failed");
        }
    }

    fn lock(&self) -> MutexGuard<'_, Recording> {
        self.recording.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TrackCrossingObserver for TelemetrySession {
    fn id(&self) -> ObserverId {
        self.id
    }

    fn on_checkpoint_crossed(&self, index: usize) {
        let route = self.crossing.route();
        let now = self.hub.clock.now_secs();

        let finished = {
            let mut recording = self.lock();
            if !recording.enabled {
                return;
            }
            if index == 0 {
                // A restarted track begins a fresh log.
                recording.events.clear();
                recording.started_at = Some(now);
                self.start_sampling(&mut recording);
            }
            let timestamp = recording.elapsed(now);
            recording.events.push(TelemetryEvent::CheckpointReached {
                checkpoint_number: index + 1,
                timestamp,
            });

            match &route {
                Some(route) if route.is_last(index) => {
                    recording.enabled = false;
                    let was_sampling = std::mem::replace(&mut recording.sampling, false);
                    Some((Arc::clone(route), recording.events.clone(), was_sampling))
                }
                _ => None,
            }
        };

        if let Some((route, events, was_sampling)) = finished {
            if was_sampling {
                self.stop_sampling();
            }
            let count = events.len();
            match route.create_telemetry(events) {
                Ok(()) => info!(route = %route.name(), events = count, "telemetry saved"),
                Err(e) => warn!(route = %route.name(), error = %e, "telemetry could not be saved"),
            }
        }
    }
}

impl WakeupObserver for TelemetrySession {
    fn id(&self) -> ObserverId {
        self.id
    }

    fn on_wakeup(&self) {
        let Some(me) = self.me.upgrade() else {
            return;
        };
        self.hub.power.lock(LOCATION_LOCK);
        self.hub.power.lock(HEART_RATE_LOCK);

        // A read that is refused never calls back, so its lock is dropped here.
        if let Err(e) = self.hub.location.get_single_update(me.clone(), self.read_timeout) {
            warn!(session = %self.id, error = %e, "location sample request rejected");
            self.release(LOCATION_LOCK);
        }
        if let Err(e) = self.hub.heart_rate.get_single_update(me, self.read_timeout) {
            warn!(session = %self.id, error = %e, "heart rate sample request rejected");
            self.release(HEART_RATE_LOCK);
        }
    }
}

impl LocationObserver for TelemetrySession {
    fn id(&self) -> ObserverId {
        self.id
    }

    fn on_location_update(&self, point: GeoPoint) {
        self.record(|timestamp| TelemetryEvent::LocationSample { point, timestamp });
        self.release(LOCATION_LOCK);
    }
}

impl HeartRateObserver for TelemetrySession {
    fn id(&self) -> ObserverId {
        self.id
    }

    fn on_heart_rate_update(&self, bpm: u32) {
        self.record(|timestamp| TelemetryEvent::HeartRateSample { bpm, timestamp });
        self.release(HEART_RATE_LOCK);
    }
}
