//! Sensor collaborators consumed by the tracker core.
//!
//! Sources are push-based: a single-shot read returns immediately and the
//! answer arrives later through the observer. A source must answer every
//! accepted read exactly once, with fresh data or, after the timeout, with
//! whatever it last knew.

pub mod mock;
pub mod power;
pub mod simulated;

use std::sync::Arc;
use std::time::Duration;

use crate::error::{Result, TrackerError};
use crate::kernel::event::ObserverId;
use crate::kernel::scheduler::WakeupScheduler;
use crate::kernel::time::Clock;
use crate::route::GeoPoint;

pub use power::{PowerLock, PowerLocks};

pub trait LocationObserver: Send + Sync {
    fn id(&self) -> ObserverId;

    fn on_location_update(&self, point: GeoPoint);
}

pub trait LocationSource: Send + Sync {
    /// Continuous updates every `interval` until detached.
    fn attach_observer(&self, observer: Arc<dyn LocationObserver>, interval: Duration) -> Result<()>;

    fn detach_observer(&self, observer: ObserverId) -> Result<()>;

    fn get_single_update(&self, observer: Arc<dyn LocationObserver>, timeout: Duration) -> Result<()>;
}

pub trait HeartRateObserver: Send + Sync {
    fn id(&self) -> ObserverId;

    fn on_heart_rate_update(&self, bpm: u32);
}

pub trait HeartRateSource: Send + Sync {
    fn get_single_update(&self, observer: Arc<dyn HeartRateObserver>, timeout: Duration) -> Result<()>;
}

/// The services the tracker components share. Built once by the
/// composition root and cloned into each component.
#[derive(Clone)]
pub struct SensorHub {
    pub scheduler: Arc<WakeupScheduler>,
    pub location: Arc<dyn LocationSource>,
    pub heart_rate: Arc<dyn HeartRateSource>,
    pub power: Arc<dyn PowerLock>,
    pub clock: Arc<dyn Clock>,
}

pub(crate) fn check_positive(what: &str, value: Duration) -> Result<()> {
    if value.is_zero() {
        return Err(TrackerError::invalid(format!("{what} must be positive")));
    }
    Ok(())
}
