use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tracing::{debug, info, trace, warn};

use super::event::ObserverId;
use super::scheduler::{WakeupObserver, WakeupScheduler};
use crate::error::{Result, TrackerError};
use crate::route::GeoPoint;
use crate::sensors::{check_positive, LocationObserver, LocationSource};

/// Notified once the watched target comes within reach.
pub trait LocationReachedObserver: Send + Sync {
    fn id(&self) -> ObserverId;

    fn on_location_reached(&self);
}

struct Watch {
    observer: Arc<dyn LocationReachedObserver>,
    target: GeoPoint,
    alarm: ObserverId,
}

/// One-shot proximity watch, one target per observer.
///
/// Each watch owns a [`ProximityAlarm`] polling the location source on a
/// periodic wakeup. The first fix within the radius removes the watch,
/// detaches its alarm and notifies the observer.
pub struct LocationReachedTrigger {
    me: Weak<LocationReachedTrigger>,
    scheduler: Arc<WakeupScheduler>,
    location: Arc<dyn LocationSource>,
    poll_interval: Duration,
    read_timeout: Duration,
    radius_m: f64,
    watches: Mutex<HashMap<ObserverId, Watch>>,
}

impl LocationReachedTrigger {
    pub fn new(
        scheduler: Arc<WakeupScheduler>,
        location: Arc<dyn LocationSource>,
        poll_interval: Duration,
        read_timeout: Duration,
        radius_m: f64,
    ) -> Result<Arc<Self>> {
        check_positive("location poll interval", poll_interval)?;
        check_positive("location read timeout", read_timeout)?;
        if !(radius_m > 0.0) {
            return Err(TrackerError::invalid("proximity radius must be positive"));
        }
        Ok(Arc::new_cyclic(|me| Self {
            me: me.clone(),
            scheduler,
            location,
            poll_interval,
            read_timeout,
            radius_m,
            watches: Mutex::new(HashMap::new()),
        }))
    }

    /// Watches `target` for `observer`, replacing any watch it already has.
    pub fn attach_observer(
        &self,
        observer: Arc<dyn LocationReachedObserver>,
        target: GeoPoint,
    ) -> Result<()> {
        let observer_id = observer.id();
        let alarm = ProximityAlarm::new(observer_id, self.me.clone());
        let alarm_id = alarm.id;

        let mut watches = self.lock();
        self.scheduler.attach(alarm, self.poll_interval, false)?;
        let previous = watches.insert(
            observer_id,
            Watch {
                observer,
                target,
                alarm: alarm_id,
            },
        );
        if let Some(previous) = previous {
            if let Err(e) = self.scheduler.detach(previous.alarm) {
                debug!(observer = %observer_id, error = %e, "previous proximity alarm already gone");
            }
        }
        debug!(
            observer = %observer_id,
            lat = target.latitude(),
            lon = target.longitude(),
            "proximity watch attached"
        );
        Ok(())
    }

    pub fn detach_observer(&self, observer: ObserverId) -> Result<()> {
        let watch = self
            .lock()
            .remove(&observer)
            .ok_or(TrackerError::UnregisteredObserver)?;
        self.scheduler.detach(watch.alarm)?;
        debug!(%observer, "proximity watch detached");
        Ok(())
    }

    pub fn is_watching(&self, observer: ObserverId) -> bool {
        self.lock().contains_key(&observer)
    }

    pub fn target_of(&self, observer: ObserverId) -> Option<GeoPoint> {
        self.lock().get(&observer).map(|watch| watch.target)
    }

    fn poll(&self, alarm: Arc<ProximityAlarm>) {
        if let Err(e) = self.location.get_single_update(alarm, self.read_timeout) {
            warn!(error = %e, "proximity read request rejected");
        }
    }

    fn check(&self, observer: ObserverId, alarm: ObserverId, position: GeoPoint) {
        let reached = {
            let mut watches = self.lock();
            let distance = match watches.get(&observer) {
                Some(watch) if watch.alarm == alarm => watch.target.distance_to(&position),
                _ => {
                    trace!(%observer, "fix for a replaced or detached watch ignored");
                    return;
                }
            };
            if distance > self.radius_m {
                trace!(%observer, distance, "target not reached yet");
                return;
            }
            let Some(watch) = watches.remove(&observer) else {
                return;
            };
            if let Err(e) = self.scheduler.detach(watch.alarm) {
                debug!(%observer, error = %e, "proximity alarm already detached");
            }
            info!(%observer, distance, "target reached");
            watch.observer
        };
        reached.on_location_reached();
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ObserverId, Watch>> {
        self.watches.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Polls the location source on behalf of one watch.
struct ProximityAlarm {
    id: ObserverId,
    me: Weak<ProximityAlarm>,
    observer: ObserverId,
    trigger: Weak<LocationReachedTrigger>,
}

impl ProximityAlarm {
    fn new(observer: ObserverId, trigger: Weak<LocationReachedTrigger>) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            id: ObserverId::new(),
            me: me.clone(),
            observer,
            trigger,
        })
    }
}

impl WakeupObserver for ProximityAlarm {
    fn id(&self) -> ObserverId {
        self.id
    }

    fn on_wakeup(&self) {
        if let (Some(trigger), Some(me)) = (self.trigger.upgrade(), self.me.upgrade()) {
            trigger.poll(me);
        }
    }
}

impl LocationObserver for ProximityAlarm {
    fn id(&self) -> ObserverId {
        self.id
    }

    fn on_location_update(&self, point: GeoPoint) {
        if let Some(trigger) = self.trigger.upgrade() {
            trigger.check(self.observer, self.id, point);
        }
    }
}
