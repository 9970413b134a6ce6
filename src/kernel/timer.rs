use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use super::scheduler::WakeupScheduler;

/// Correlates a fired timer with the subscription that scheduled it.
/// Allocated by the scheduler; never reused by the same scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WakeupToken(u64);

impl WakeupToken {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Driver-side handle used to cancel a scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

impl TimerHandle {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// The host timer primitive. Implementations report expiry asynchronously
/// (never from inside `schedule`) by handing the token back to
/// [`WakeupScheduler::dispatch`].
pub trait TimerDriver: Send + Sync {
    fn schedule(&self, token: WakeupToken, interval: Duration, one_shot: bool) -> TimerHandle;

    fn cancel(&self, handle: TimerHandle);
}

/// Timer driver backed by tokio tasks. Fired tokens are queued on an
/// unbounded channel; [`run_dispatch`] drains it into a scheduler.
pub struct TokioTimer {
    runtime: Handle,
    fired: mpsc::UnboundedSender<WakeupToken>,
    next_handle: AtomicU64,
    timers: Mutex<HashMap<TimerHandle, CancellationToken>>,
}

impl TokioTimer {
    pub fn new(runtime: Handle) -> (Self, mpsc::UnboundedReceiver<WakeupToken>) {
        let (fired, rx) = mpsc::unbounded_channel();
        let timer = Self {
            runtime,
            fired,
            next_handle: AtomicU64::new(1),
            timers: Mutex::new(HashMap::new()),
        };
        (timer, rx)
    }

    pub fn active_count(&self) -> usize {
        self.timers.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl TimerDriver for TokioTimer {
    fn schedule(&self, token: WakeupToken, interval: Duration, one_shot: bool) -> TimerHandle {
        let handle = TimerHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        let cancel = CancellationToken::new();
        let stop = cancel.clone();
        let fired = self.fired.clone();

        self.runtime.spawn(async move {
            let mut cadence = interval_at(Instant::now() + interval, interval);
            cadence.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = stop.cancelled() => break,
                    _ = cadence.tick() => {
                        if fired.send(token).is_err() || one_shot {
                            break;
                        }
                    }
                }
            }
            trace!(?token, "timer task finished");
        });

        self.timers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(handle, cancel);
        debug!(?token, ?handle, ?interval, one_shot, "timer scheduled");
        handle
    }

    fn cancel(&self, handle: TimerHandle) {
        let cancel = self
            .timers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&handle);
        if let Some(cancel) = cancel {
            cancel.cancel();
            debug!(?handle, "timer cancelled");
        }
    }
}

impl Drop for TokioTimer {
    fn drop(&mut self) {
        let timers = std::mem::take(self.timers.get_mut().unwrap_or_else(PoisonError::into_inner));
        for cancel in timers.into_values() {
            cancel.cancel();
        }
    }
}

/// Feeds fired tokens into `scheduler` until `shutdown` is cancelled or the
/// timer that sends them is dropped.
pub async fn run_dispatch(
    scheduler: Arc<WakeupScheduler>,
    mut fired: mpsc::UnboundedReceiver<WakeupToken>,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            token = fired.recv() => match token {
                Some(token) => scheduler.dispatch(token),
                None => break,
            },
        }
    }
    debug!("wakeup dispatch stopped");
}
