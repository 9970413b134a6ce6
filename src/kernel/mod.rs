pub mod checkpoint;
pub mod crossing;
pub mod event;
pub mod scheduler;
pub mod telemetry;
pub mod time;
pub mod timer;
pub mod trigger;
