use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackerError};

/// Environment variable naming a JSON config file.
pub const CONFIG_ENV: &str = "WAYMARK_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// A checkpoint counts as reached within this many meters.
    pub proximity_radius_m: f64,
    pub location_poll_interval_secs: u64,
    pub location_read_timeout_secs: u64,
    pub sampling_interval_secs: u64,
    pub sensor_read_timeout_secs: u64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            proximity_radius_m: 15.0,
            location_poll_interval_secs: 10,
            location_read_timeout_secs: 30,
            sampling_interval_secs: 60,
            sensor_read_timeout_secs: 20,
        }
    }
}

impl TrackerConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Reads the file named by `WAYMARK_CONFIG`, or the defaults if unset.
    pub fn from_env() -> Result<Self> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.proximity_radius_m > 0.0) {
            return Err(TrackerError::Config("proximity_radius_m must be positive".into()));
        }
        let intervals = [
            ("location_poll_interval_secs", self.location_poll_interval_secs),
            ("location_read_timeout_secs", self.location_read_timeout_secs),
            ("sampling_interval_secs", self.sampling_interval_secs),
            ("sensor_read_timeout_secs", self.sensor_read_timeout_secs),
        ];
        for (name, value) in intervals {
            if value == 0 {
                return Err(TrackerError::Config(format!("{name} must be positive")));
            }
        }
        Ok(())
    }

    pub fn location_poll_interval(&self) -> Duration {
        Duration::from_secs(self.location_poll_interval_secs)
    }

    pub fn location_read_timeout(&self) -> Duration {
        Duration::from_secs(self.location_read_timeout_secs)
    }

    pub fn sampling_interval(&self) -> Duration {
        Duration::from_secs(self.sampling_interval_secs)
    }

    pub fn sensor_read_timeout(&self) -> Duration {
        Duration::from_secs(self.sensor_read_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config = TrackerConfig::from_json_str(r#"{ "sampling_interval_secs": 5 }"#).unwrap();
        assert_eq!(config.sampling_interval(), Duration::from_secs(5));
        assert_eq!(config.proximity_radius_m, 15.0);
        assert_eq!(config.location_read_timeout_secs, 30);
    }

    #[test]
    fn zero_interval_is_rejected() {
        let err = TrackerConfig::from_json_str(r#"{ "location_poll_interval_secs": 0 }"#).unwrap_err();
        assert!(matches!(err, TrackerError::Config(_)), "got {err:?}");
    }
}
