use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tracing::{debug, info, warn};

use super::checkpoint::CheckpointCrossing;
use super::event::ObserverId;
use super::time::Clock;
use super::trigger::{LocationReachedObserver, LocationReachedTrigger};
use crate::error::{Result, TrackerError};
use crate::route::Route;

/// Notified with the zero-based index of every checkpoint just completed.
pub trait TrackCrossingObserver: Send + Sync {
    fn id(&self) -> ObserverId;

    fn on_checkpoint_crossed(&self, index: usize);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrossingState {
    NotStarted,
    /// `next` is the checkpoint being walked towards.
    Crossing { next: usize },
    Ended,
}

struct Progress {
    route: Option<Arc<Route>>,
    state: CrossingState,
    started_at: u64,
    last_partial: u64,
}

/// Progress of one traversal of a route, checkpoint by checkpoint.
///
/// While crossing, the next checkpoint is watched through the
/// [`LocationReachedTrigger`]; reaching it advances the crossing exactly as
/// a manual [`advance_checkpoint`](Self::advance_checkpoint) does.
pub struct TrackCrossing {
    me: Weak<TrackCrossing>,
    id: ObserverId,
    trigger: Arc<LocationReachedTrigger>,
    clock: Arc<dyn Clock>,
    progress: Mutex<Progress>,
    observers: Mutex<Vec<(ObserverId, Weak<dyn TrackCrossingObserver>)>>,
}

impl TrackCrossing {
    pub fn new(trigger: Arc<LocationReachedTrigger>, clock: Arc<dyn Clock>) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            id: ObserverId::new(),
            trigger,
            clock,
            progress: Mutex::new(Progress {
                route: None,
                state: CrossingState::NotStarted,
                started_at: 0,
                last_partial: 0,
            }),
            observers: Mutex::new(Vec::new()),
        })
    }

    /// (Re)starts a traversal of `route` from its first checkpoint.
    pub fn start_track(&self, route: Arc<Route>) -> Result<()> {
        let first = route
            .checkpoint(0)
            .ok_or_else(|| TrackerError::invalid("route has no checkpoints"))?
            .point();
        let me = self.reached_observer()?;

        let mut progress = self.lock();
        // Replaces the watch of a traversal already under way.
        self.trigger.attach_observer(me, first)?;
        progress.started_at = self.clock.now_secs();
        progress.last_partial = 0;
        progress.state = CrossingState::Crossing { next: 0 };
        progress.route = Some(Arc::clone(&route));
        info!(route = %route.name(), checkpoints = route.len(), "track started");
        Ok(())
    }

    pub fn advance_checkpoint(&self) -> Result<()> {
        self.advance(false).map(|_| ())
    }

    /// Completes the checkpoint being walked towards. Returns `false` for an
    /// arrival that is no longer current.
    fn advance(&self, arrival: bool) -> Result<bool> {
        let crossed = {
            let mut progress = self.lock();
            let next = match progress.state {
                CrossingState::NotStarted => return Err(TrackerError::NoActiveRoute),
                CrossingState::Ended => return Err(TrackerError::RouteEnded),
                CrossingState::Crossing { next } => next,
            };
            // A hit removes its own watch, so a live watch means a manual
            // advance already completed the checkpoint this arrival was for.
            if arrival && self.trigger.is_watching(self.id) {
                debug!(checkpoint = next, "stale arrival ignored");
                return Ok(false);
            }
            let route = progress.route.clone().ok_or(TrackerError::NoActiveRoute)?;
            let partial = self.clock.now_secs().saturating_sub(progress.started_at);

            match route.checkpoint(next + 1) {
                Some(checkpoint) => {
                    self.trigger
                        .attach_observer(self.reached_observer()?, checkpoint.point())?;
                    progress.state = CrossingState::Crossing { next: next + 1 };
                }
                None => {
                    self.release_watch();
                    progress.state = CrossingState::Ended;
                }
            }
            progress.last_partial = partial;
            info!(
                route = %route.name(),
                checkpoint = next,
                partial_secs = partial,
                "checkpoint crossed"
            );
            next
        };

        self.notify(crossed);
        Ok(true)
    }

    /// The most recently completed checkpoint with its partial time.
    pub fn get_last_crossed(&self) -> Result<CheckpointCrossing> {
        let progress = self.lock();
        let route = progress.route.clone().ok_or(TrackerError::NoSuchCheckpoint)?;
        let index = match progress.state {
            CrossingState::NotStarted | CrossingState::Crossing { next: 0 } => {
                return Err(TrackerError::NoSuchCheckpoint)
            }
            CrossingState::Crossing { next } => next - 1,
            CrossingState::Ended => route.len() - 1,
        };
        CheckpointCrossing::new(index, progress.last_partial, route)
    }

    pub fn get_next_checkpoint(&self) -> Result<usize> {
        match self.lock().state {
            CrossingState::NotStarted => Err(TrackerError::NoActiveRoute),
            CrossingState::Ended => Err(TrackerError::RouteEnded),
            CrossingState::Crossing { next } => Ok(next),
        }
    }

    /// Seconds from the start of the track to the last crossed checkpoint.
    pub fn last_partial_time(&self) -> Result<u64> {
        let progress = self.lock();
        match progress.state {
            CrossingState::NotStarted => Err(TrackerError::NoActiveRoute),
            _ => Ok(progress.last_partial),
        }
    }

    /// Stops the traversal without notifying anyone.
    pub fn abort(&self) {
        let mut progress = self.lock();
        if matches!(progress.state, CrossingState::Crossing { .. }) {
            self.release_watch();
        }
        progress.route = None;
        progress.state = CrossingState::NotStarted;
        progress.last_partial = 0;
        info!("track aborted");
    }

    /// Identity under which the crossing watches checkpoints.
    pub fn observer_id(&self) -> ObserverId {
        self.id
    }

    pub fn state(&self) -> CrossingState {
        self.lock().state
    }

    /// The route being (or last) crossed; `None` before a start or after an abort.
    pub fn route(&self) -> Option<Arc<Route>> {
        self.lock().route.clone()
    }

    pub fn is_crossing(&self) -> bool {
        matches!(self.state(), CrossingState::Crossing { .. })
    }

    pub fn attach_observer(&self, observer: &Arc<dyn TrackCrossingObserver>) {
        let id = observer.id();
        let mut observers = self.observers();
        if !observers.iter().any(|(existing, _)| *existing == id) {
            observers.push((id, Arc::downgrade(observer)));
        }
    }

    pub fn detach_observer(&self, observer: ObserverId) {
        self.observers().retain(|(id, _)| *id != observer);
    }

    fn notify(&self, index: usize) {
        let targets: Vec<Arc<dyn TrackCrossingObserver>> = {
            let mut observers = self.observers();
            observers.retain(|(_, weak)| weak.strong_count() > 0);
            observers.iter().filter_map(|(_, weak)| weak.upgrade()).collect()
        };
        for observer in targets {
            observer.on_checkpoint_crossed(index);
        }
    }

    /// Drops the watch on the current checkpoint. A watch that already
    /// fired has removed itself.
    fn release_watch(&self) {
        match self.trigger.detach_observer(self.id) {
            Ok(()) | Err(TrackerError::UnregisteredObserver) => {}
            Err(e) => warn!(error = %e, "failed to release checkpoint watch"),
        }
    }

    fn reached_observer(&self) -> Result<Arc<dyn LocationReachedObserver>> {
        let me: Arc<dyn LocationReachedObserver> = self
            .me
            .upgrade()
            .ok_or_else(|| TrackerError::invalid("track crossing is being dropped"))?;
        Ok(me)
    }

    fn lock(&self) -> MutexGuard<'_, Progress> {
        self.progress.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn observers(&self) -> MutexGuard<'_, Vec<(ObserverId, Weak<dyn TrackCrossingObserver>)>> {
        self.observers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl LocationReachedObserver for TrackCrossing {
    fn id(&self) -> ObserverId {
        self.id
    }

    fn on_location_reached(&self) {
        match self.advance(true) {
            Ok(_) => {}
            Err(TrackerError::NoActiveRoute) => debug!("checkpoint reached with no active route"),
            Err(e) => warn!(error = %e, "could not advance on reached checkpoint"),
        }
    }
}
