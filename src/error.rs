use thiserror::Error;

/// Every failure the tracker core can report.
///
/// Validation and state errors are raised synchronously and never retried.
/// Sensor read timeouts are not errors: sources always answer, possibly with
/// stale data.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("observer has no active registration")]
    UnregisteredObserver,

    #[error("no power lock named `{0}` is held")]
    UnregisteredLock(String),

    #[error("no route is being crossed")]
    NoActiveRoute,

    #[error("the route has already ended")]
    RouteEnded,

    #[error("telemetry cannot be enabled once the track has started")]
    TrackAlreadyStarted,

    #[error("no checkpoint has been crossed yet")]
    NoSuchCheckpoint,

    #[error("route has no best telemetry")]
    NoBestTelemetry,

    #[error("best telemetry has no checkpoint-reached event numbered {0}")]
    NoMatchingEvent(usize),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("storage i/o: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl TrackerError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        TrackerError::InvalidArgument(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, TrackerError>;
