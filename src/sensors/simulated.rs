use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::time::{interval, sleep, timeout, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use super::{check_positive, HeartRateObserver, HeartRateSource, LocationObserver, LocationSource};
use crate::error::{Result, TrackerError};
use crate::kernel::event::ObserverId;
use crate::route::GeoPoint;

struct Walk {
    path: Vec<GeoPoint>,
    position: usize,
}

impl Walk {
    fn current(&self) -> GeoPoint {
        self.path[self.position.min(self.path.len() - 1)]
    }

    fn step(&mut self) -> GeoPoint {
        if self.position + 1 < self.path.len() {
            self.position += 1;
        }
        self.current()
    }
}

/// A GPS that walks a fixed path, one position per answered read.
///
/// Reads take `latency` to answer. A read whose timeout expires first is
/// answered with the previous position and does not move the walker.
pub struct SimulatedLocationSource {
    runtime: Handle,
    latency: Duration,
    walk: Arc<Mutex<Walk>>,
    continuous: Mutex<HashMap<ObserverId, CancellationToken>>,
}

impl SimulatedLocationSource {
    pub fn new(runtime: Handle, path: Vec<GeoPoint>, latency: Duration) -> Result<Self> {
        if path.is_empty() {
            return Err(TrackerError::invalid("simulated walk needs at least one point"));
        }
        Ok(Self {
            runtime,
            latency,
            walk: Arc::new(Mutex::new(Walk { path, position: 0 })),
            continuous: Mutex::new(HashMap::new()),
        })
    }

    /// Densifies `waypoints` into a path of `steps` points per leg.
    pub fn path_through(waypoints: &[GeoPoint], steps: usize) -> Vec<GeoPoint> {
        let steps = steps.max(1);
        let mut path = Vec::new();
        for leg in waypoints.windows(2) {
            for i in 0..steps {
                path.push(leg[0].lerp(&leg[1], i as f64 / steps as f64));
            }
        }
        path.extend(waypoints.last().copied());
        path
    }
}

impl LocationSource for SimulatedLocationSource {
    fn attach_observer(&self, observer: Arc<dyn LocationObserver>, every: Duration) -> Result<()> {
        check_positive("location interval", every)?;
        let id = observer.id();
        let stop = CancellationToken::new();
        let cancelled = stop.clone();
        let walk = Arc::clone(&self.walk);
        self.runtime.spawn(async move {
            let mut cadence = interval(every);
            cadence.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = cancelled.cancelled() => break,
                    _ = cadence.tick() => {
                        let point = walk.lock().unwrap_or_else(PoisonError::into_inner).current();
                        observer.on_location_update(point);
                    }
                }
            }
        });
        let replaced = self
            .continuous
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, stop);
        if let Some(old) = replaced {
            old.cancel();
        }
        Ok(())
    }

    fn detach_observer(&self, observer: ObserverId) -> Result<()> {
        let stop = self
            .continuous
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&observer)
            .ok_or(TrackerError::UnregisteredObserver)?;
        stop.cancel();
        Ok(())
    }

    fn get_single_update(&self, observer: Arc<dyn LocationObserver>, limit: Duration) -> Result<()> {
        check_positive("location read timeout", limit)?;
        let walk = Arc::clone(&self.walk);
        let latency = self.latency;
        self.runtime.spawn(async move {
            let fresh = timeout(limit, sleep(latency)).await.is_ok();
            let point = {
                let mut walk = walk.lock().unwrap_or_else(PoisonError::into_inner);
                if fresh {
                    walk.step()
                } else {
                    walk.current()
                }
            };
            trace!(fresh, lat = point.latitude(), lon = point.longitude(), "simulated fix");
            observer.on_location_update(point);
        });
        Ok(())
    }
}

/// Pulse that climbs from `resting_bpm` with each answered read and falls
/// back periodically.
pub struct SimulatedHeartRateSource {
    runtime: Handle,
    resting_bpm: u32,
    reads: Arc<AtomicU32>,
}

impl SimulatedHeartRateSource {
    pub fn new(runtime: Handle, resting_bpm: u32) -> Self {
        Self {
            runtime,
            resting_bpm,
            reads: Arc::new(AtomicU32::new(0)),
        }
    }
}

impl HeartRateSource for SimulatedHeartRateSource {
    fn get_single_update(&self, observer: Arc<dyn HeartRateObserver>, limit: Duration) -> Result<()> {
        check_positive("heart rate read timeout", limit)?;
        let n = self.reads.fetch_add(1, Ordering::Relaxed);
        let bpm = self.resting_bpm + (n * 7) % 40;
        self.runtime.spawn(async move {
            // Real straps answer within a second or two.
            if timeout(limit, sleep(Duration::from_millis(200))).await.is_err() {
                debug!("simulated heart rate read hit its timeout");
            }
            observer.on_heart_rate_update(bpm);
        });
        Ok(())
    }
}
