pub mod config;
pub mod error;
pub mod kernel;
pub mod route;
pub mod sensors;
pub mod tracker;

pub use config::TrackerConfig;
pub use error::{Result, TrackerError};
pub use tracker::Tracker;
