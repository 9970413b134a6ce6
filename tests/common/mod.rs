#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use waymark::kernel::crossing::TrackCrossingObserver;
use waymark::kernel::event::ObserverId;
use waymark::kernel::scheduler::WakeupScheduler;
use waymark::kernel::time::ManualClock;
use waymark::kernel::trigger::LocationReachedObserver;
use waymark::route::{GeoPoint, Route, TelemetryStorage};
use waymark::sensors::mock::{ManualTimer, MockHeartRateSource, MockLocationSource};
use waymark::sensors::{PowerLocks, SensorHub};

/// Every collaborator of the tracker, driven by hand.
pub struct Rig {
    pub timer: Arc<ManualTimer>,
    pub scheduler: Arc<WakeupScheduler>,
    pub location: Arc<MockLocationSource>,
    pub heart_rate: Arc<MockHeartRateSource>,
    pub power: Arc<PowerLocks>,
    pub clock: Arc<ManualClock>,
    pub hub: SensorHub,
}

impl Rig {
    pub fn new() -> Self {
        let timer = Arc::new(ManualTimer::new());
        let scheduler = Arc::new(WakeupScheduler::new(timer.clone()));
        let location = Arc::new(MockLocationSource::new());
        let heart_rate = Arc::new(MockHeartRateSource::new());
        let power = Arc::new(PowerLocks::new());
        let clock = Arc::new(ManualClock::new(1_000));
        let hub = SensorHub {
            scheduler: scheduler.clone(),
            location: location.clone(),
            heart_rate: heart_rate.clone(),
            power: power.clone(),
            clock: clock.clone(),
        };
        Self {
            timer,
            scheduler,
            location,
            heart_rate,
            power,
            clock,
            hub,
        }
    }

    /// Expires every live timer once.
    pub fn tick(&self) {
        self.timer.fire_all(&self.scheduler);
    }
}

pub fn point(latitude: f64, longitude: f64) -> GeoPoint {
    GeoPoint::new(latitude, longitude).unwrap()
}

pub fn route(points: &[(f64, f64)], storage: Arc<dyn TelemetryStorage>) -> Arc<Route> {
    let points = points.iter().map(|&(lat, lon)| point(lat, lon)).collect();
    Arc::new(Route::new("test route", points, storage).unwrap())
}

/// Counts proximity notifications.
#[derive(Default)]
pub struct Arrivals {
    id: ObserverId,
    count: AtomicUsize,
}

impl Arrivals {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

impl LocationReachedObserver for Arrivals {
    fn id(&self) -> ObserverId {
        self.id
    }

    fn on_location_reached(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }
}

/// Remembers every crossed checkpoint index.
#[derive(Default)]
pub struct Crossings {
    id: ObserverId,
    seen: Mutex<Vec<usize>>,
}

impl Crossings {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn seen(&self) -> Vec<usize> {
        self.seen.lock().unwrap().clone()
    }
}

impl TrackCrossingObserver for Crossings {
    fn id(&self) -> ObserverId {
        self.id
    }

    fn on_checkpoint_crossed(&self, index: usize) {
        self.seen.lock().unwrap().push(index);
    }
}
