use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::{debug, trace};

use super::event::ObserverId;
use super::timer::{TimerDriver, TimerHandle, WakeupToken};
use crate::error::{Result, TrackerError};

/// Receives scheduled wakeups.
pub trait WakeupObserver: Send + Sync {
    fn id(&self) -> ObserverId;

    fn on_wakeup(&self);
}

struct Subscription {
    observer: Arc<dyn WakeupObserver>,
    interval: Duration,
    one_shot: bool,
    handle: TimerHandle,
}

/// One record per subscription, reachable by token, observer and handle.
/// All three indices change together.
#[derive(Default)]
struct Schedule {
    subscriptions: HashMap<WakeupToken, Subscription>,
    by_observer: HashMap<ObserverId, WakeupToken>,
    by_handle: HashMap<TimerHandle, WakeupToken>,
}

impl Schedule {
    fn insert(&mut self, token: WakeupToken, subscription: Subscription) {
        self.by_observer.insert(subscription.observer.id(), token);
        self.by_handle.insert(subscription.handle, token);
        self.subscriptions.insert(token, subscription);
    }

    fn remove(&mut self, token: WakeupToken) -> Option<Subscription> {
        let subscription = self.subscriptions.remove(&token)?;
        self.by_observer.remove(&subscription.observer.id());
        self.by_handle.remove(&subscription.handle);
        Some(subscription)
    }
}

/// Multiplexes logical periodic and one-shot subscriptions onto a
/// [`TimerDriver`], routing each fired timer back to its subscriber.
pub struct WakeupScheduler {
    timer: Arc<dyn TimerDriver>,
    next_token: AtomicU64,
    schedule: Mutex<Schedule>,
}

impl WakeupScheduler {
    pub fn new(timer: Arc<dyn TimerDriver>) -> Self {
        Self {
            timer,
            next_token: AtomicU64::new(1),
            schedule: Mutex::new(Schedule::default()),
        }
    }

    /// Subscribes `observer` to a wakeup every `interval` (or once, after
    /// `interval`, when `one_shot`). An existing subscription of the same
    /// observer is cancelled and replaced.
    pub fn attach(
        &self,
        observer: Arc<dyn WakeupObserver>,
        interval: Duration,
        one_shot: bool,
    ) -> Result<WakeupToken> {
        if interval.is_zero() {
            return Err(TrackerError::invalid("wakeup interval must be positive"));
        }

        let token = WakeupToken::new(self.next_token.fetch_add(1, Ordering::SeqCst));
        let observer_id = observer.id();
        let mut schedule = self.lock();

        if let Some(previous) = schedule.by_observer.get(&observer_id).copied() {
            if let Some(old) = schedule.remove(previous) {
                self.timer.cancel(old.handle);
                debug!(observer = %observer_id, token = ?previous, "replacing wakeup subscription");
            }
        }

        let handle = self.timer.schedule(token, interval, one_shot);
        schedule.insert(
            token,
            Subscription {
                observer,
                interval,
                one_shot,
                handle,
            },
        );
        debug!(observer = %observer_id, ?token, ?interval, one_shot, "wakeup attached");
        Ok(token)
    }

    pub fn detach(&self, observer: ObserverId) -> Result<()> {
        let mut schedule = self.lock();
        let token = schedule
            .by_observer
            .get(&observer)
            .copied()
            .ok_or(TrackerError::UnregisteredObserver)?;
        if let Some(subscription) = schedule.remove(token) {
            self.timer.cancel(subscription.handle);
        }
        debug!(%observer, ?token, "wakeup detached");
        Ok(())
    }

    /// Timer-fired entry point. Tokens of detached subscriptions are
    /// ignored: the timer may have fired while the cancellation was in
    /// flight. One-shot subscriptions are removed before their callback runs.
    pub fn dispatch(&self, token: WakeupToken) {
        let observer = {
            let mut schedule = self.lock();
            let (observer, one_shot) = match schedule.subscriptions.get(&token) {
                Some(sub) => (Arc::clone(&sub.observer), sub.one_shot),
                None => {
                    trace!(?token, "stale wakeup token dropped");
                    return;
                }
            };
            if one_shot {
                if let Some(sub) = schedule.remove(token) {
                    self.timer.cancel(sub.handle);
                }
            }
            observer
        };

        trace!(observer = %observer.id(), ?token, "dispatching wakeup");
        observer.on_wakeup();
    }

    /// Same as [`dispatch`](Self::dispatch) for drivers that only report the
    /// handle of the expired timer.
    pub fn dispatch_handle(&self, handle: TimerHandle) {
        let token = self.lock().by_handle.get(&handle).copied();
        match token {
            Some(token) => self.dispatch(token),
            None => trace!(?handle, "stale timer handle dropped"),
        }
    }

    pub fn is_attached(&self, observer: ObserverId) -> bool {
        self.lock().by_observer.contains_key(&observer)
    }

    pub fn interval_of(&self, observer: ObserverId) -> Option<Duration> {
        let schedule = self.lock();
        let token = schedule.by_observer.get(&observer)?;
        schedule.subscriptions.get(token).map(|sub| sub.interval)
    }

    pub fn active_count(&self) -> usize {
        self.lock().subscriptions.len()
    }

    fn lock(&self) -> MutexGuard<'_, Schedule> {
        self.schedule.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
