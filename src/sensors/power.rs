use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{trace, warn};

use crate::error::{Result, TrackerError};

/// Named wake locks that keep the device awake across a sensor read.
pub trait PowerLock: Send + Sync {
    fn lock(&self, name: &str);

    /// Fails with `UnregisteredLock` when `name` is not held.
    fn unlock(&self, name: &str) -> Result<()>;
}

/// Counting lock registry: every `lock` of a name needs its own `unlock`.
#[derive(Debug, Default)]
pub struct PowerLocks {
    held: Mutex<HashMap<String, usize>>,
}

impl PowerLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_held(&self, name: &str) -> bool {
        self.held_count(name) > 0
    }

    pub fn held_count(&self, name: &str) -> usize {
        self.entries().get(name).copied().unwrap_or(0)
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, usize>> {
        self.held.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PowerLock for PowerLocks {
    fn lock(&self, name: &str) {
        let mut held = self.entries();
        let count = held.entry(name.to_string()).or_insert(0);
        *count += 1;
        trace!(lock = name, count = *count, "power lock acquired");
    }

    fn unlock(&self, name: &str) -> Result<()> {
        let mut held = self.entries();
        match held.get_mut(name) {
            Some(count) if *count > 1 => {
                *count -= 1;
            }
            Some(_) => {
                held.remove(name);
            }
            None => {
                warn!(lock = name, "release of a lock that is not held");
                return Err(TrackerError::UnregisteredLock(name.to_string()));
            }
        }
        trace!(lock = name, "power lock released");
        Ok(())
    }
}
