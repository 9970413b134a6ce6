use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::error::Result;
use crate::kernel::telemetry::event::Telemetry;

/// Persistence capability behind a [`Route`](super::Route).
pub trait TelemetryStorage: Send + Sync {
    fn telemetries(&self) -> Result<Vec<Telemetry>>;

    fn create_telemetry(&self, telemetry: Telemetry) -> Result<()>;

    /// The reference run deltas are computed against. Shortest duration
    /// wins; the earliest stored run wins a tie.
    fn best_telemetry(&self) -> Result<Option<Telemetry>> {
        Ok(self
            .telemetries()?
            .into_iter()
            .min_by_key(Telemetry::duration))
    }
}

/// Volatile storage, used by the demo harness and tests.
#[derive(Debug, Default)]
pub struct InMemoryTelemetryStorage {
    telemetries: Mutex<Vec<Telemetry>>,
}

impl InMemoryTelemetryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_telemetries(telemetries: Vec<Telemetry>) -> Self {
        Self {
            telemetries: Mutex::new(telemetries),
        }
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entries(&self) -> MutexGuard<'_, Vec<Telemetry>> {
        self.telemetries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TelemetryStorage for InMemoryTelemetryStorage {
    fn telemetries(&self) -> Result<Vec<Telemetry>> {
        Ok(self.entries().clone())
    }

    fn create_telemetry(&self, telemetry: Telemetry) -> Result<()> {
        self.entries().push(telemetry);
        Ok(())
    }
}

/// Stores every telemetry of one route as a single pretty-printed JSON array.
/// The whole file is rewritten on each insert.
#[derive(Debug)]
pub struct JsonFileTelemetryStorage {
    path: PathBuf,
    telemetries: Mutex<Vec<Telemetry>>,
}

impl JsonFileTelemetryStorage {
    /// Opens `path`, loading existing runs. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let telemetries = if path.exists() {
            let content = fs::read_to_string(&path)?;
            serde_json::from_str(&content)?
        } else {
            Vec::new()
        };
        debug!(path = %path.display(), runs = telemetries.len(), "telemetry store opened");
        Ok(Self {
            path,
            telemetries: Mutex::new(telemetries),
        })
    }

    fn save(&self, telemetries: &[Telemetry]) -> Result<()> {
        let json = serde_json::to_string_pretty(telemetries)?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}

impl TelemetryStorage for JsonFileTelemetryStorage {
    fn telemetries(&self) -> Result<Vec<Telemetry>> {
        Ok(self
            .telemetries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn create_telemetry(&self, telemetry: Telemetry) -> Result<()> {
        let mut telemetries = self.telemetries.lock().unwrap_or_else(PoisonError::into_inner);
        telemetries.push(telemetry);
        if let Err(e) = self.save(&telemetries) {
            // Keep memory and disk in agreement.
            telemetries.pop();
            return Err(e);
        }
        Ok(())
    }
}
