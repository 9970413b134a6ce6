//! Telemetry: the timestamped record of one route traversal.
//!
//! The session in [`recorder`] is the only writer. A log is frozen into a
//! [`event::Telemetry`] and handed to the route's storage when the last
//! checkpoint is crossed; persisted telemetries are never modified.

pub mod event;
pub mod metrics;
pub mod recorder;
