use thiserror::Error;
use transport_bus::BusError;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} must be a positive whole number of seconds, got {value:?}")]
    InvalidInterval { key: &'static str, value: String },
    #[error("unknown BUS_MODE {0:?} (expected `nats` or `stdout`)")]
    UnknownBusMode(String),
}

/// Failure of a single tick. Contained by the emitter loop.
#[derive(Debug, Error)]
pub enum EmitError {
    #[error("failed to serialize payload: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error(transparent)]
    Publish(#[from] BusError),
}

#[derive(Debug, Error)]
pub enum EmitterError {
    #[error("emitter interval must be greater than zero")]
    ZeroInterval,
    #[error("emitter interval {0:?} is too large to schedule")]
    IntervalTooLarge(std::time::Duration),
    #[error("{0} emitter is already running")]
    AlreadyStarted(&'static str),
    #[error("{0} emitter was stopped and cannot be restarted")]
    Terminated(&'static str),
    #[error("{kind} emitter needs a tokio runtime: {source}")]
    NoRuntime {
        kind: &'static str,
        #[source]
        source: tokio::runtime::TryCurrentError,
    },
    #[error("{kind} emitter loop did not exit cleanly: {source}")]
    LoopPanicked {
        kind: &'static str,
        #[source]
        source: tokio::task::JoinError,
    },
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("service failed to start: {0}")]
    Start(#[source] EmitterError),
    #[error("service failed to stop: {0}")]
    Stop(#[source] EmitterError),
}
