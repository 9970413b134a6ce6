//! Deterministic collaborators for driving the tracker by hand.
//!
//! Nothing here fires on its own: timers fire when asked, and sensor reads
//! stay pending until answered.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use super::{check_positive, HeartRateObserver, HeartRateSource, LocationObserver, LocationSource};
use crate::error::{Result, TrackerError};
use crate::kernel::event::ObserverId;
use crate::kernel::scheduler::WakeupScheduler;
use crate::kernel::timer::{TimerDriver, TimerHandle, WakeupToken};
use crate::route::GeoPoint;

fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledTimer {
    pub token: WakeupToken,
    pub handle: TimerHandle,
    pub interval: Duration,
    pub one_shot: bool,
}

/// Timer driver that only records what is scheduled.
#[derive(Debug, Default)]
pub struct ManualTimer {
    next_handle: AtomicU64,
    timers: Mutex<Vec<ScheduledTimer>>,
}

impl ManualTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Live timers in scheduling order.
    pub fn scheduled(&self) -> Vec<ScheduledTimer> {
        guard(&self.timers).clone()
    }

    pub fn active_count(&self) -> usize {
        guard(&self.timers).len()
    }

    /// Expires every live timer once, in scheduling order.
    pub fn fire_all(&self, scheduler: &WakeupScheduler) {
        for timer in self.scheduled() {
            scheduler.dispatch(timer.token);
        }
    }
}

impl TimerDriver for ManualTimer {
    fn schedule(&self, token: WakeupToken, interval: Duration, one_shot: bool) -> TimerHandle {
        let handle = TimerHandle::from_raw(self.next_handle.fetch_add(1, Ordering::Relaxed));
        guard(&self.timers).push(ScheduledTimer {
            token,
            handle,
            interval,
            one_shot,
        });
        handle
    }

    fn cancel(&self, handle: TimerHandle) {
        guard(&self.timers).retain(|timer| timer.handle != handle);
    }
}

/// Location source whose reads are answered by [`respond`](Self::respond).
#[derive(Default)]
pub struct MockLocationSource {
    pending: Mutex<Vec<Arc<dyn LocationObserver>>>,
    continuous: Mutex<HashMap<ObserverId, Arc<dyn LocationObserver>>>,
    timeouts: Mutex<Vec<Duration>>,
}

impl MockLocationSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> usize {
        guard(&self.pending).len()
    }

    /// Timeouts of every single read requested so far.
    pub fn requested_timeouts(&self) -> Vec<Duration> {
        guard(&self.timeouts).clone()
    }

    pub fn is_attached(&self, observer: ObserverId) -> bool {
        guard(&self.continuous).contains_key(&observer)
    }

    /// Answers every pending single read and pushes to continuous observers.
    pub fn respond(&self, point: GeoPoint) {
        let pending = std::mem::take(&mut *guard(&self.pending));
        let continuous: Vec<_> = guard(&self.continuous).values().cloned().collect();
        for observer in pending.into_iter().chain(continuous) {
            observer.on_location_update(point);
        }
    }
}

impl LocationSource for MockLocationSource {
    fn attach_observer(&self, observer: Arc<dyn LocationObserver>, interval: Duration) -> Result<()> {
        check_positive("location interval", interval)?;
        guard(&self.continuous).insert(observer.id(), observer);
        Ok(())
    }

    fn detach_observer(&self, observer: ObserverId) -> Result<()> {
        guard(&self.continuous)
            .remove(&observer)
            .map(|_| ())
            .ok_or(TrackerError::UnregisteredObserver)
    }

    fn get_single_update(&self, observer: Arc<dyn LocationObserver>, timeout: Duration) -> Result<()> {
        check_positive("location read timeout", timeout)?;
        guard(&self.timeouts).push(timeout);
        guard(&self.pending).push(observer);
        Ok(())
    }
}

/// Heart-rate source whose reads are answered by [`respond`](Self::respond).
#[derive(Default)]
pub struct MockHeartRateSource {
    pending: Mutex<Vec<Arc<dyn HeartRateObserver>>>,
}

impl MockHeartRateSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> usize {
        guard(&self.pending).len()
    }

    pub fn respond(&self, bpm: u32) {
        let pending = std::mem::take(&mut *guard(&self.pending));
        for observer in pending {
            observer.on_heart_rate_update(bpm);
        }
    }
}

impl HeartRateSource for MockHeartRateSource {
    fn get_single_update(&self, observer: Arc<dyn HeartRateObserver>, timeout: Duration) -> Result<()> {
        check_positive("heart rate read timeout", timeout)?;
        guard(&self.pending).push(observer);
        Ok(())
    }
}
