pub mod commands;
pub mod config;
pub mod emitter;
pub mod error;
pub mod heartbeat;
pub mod lifecycle;
pub mod message;
pub mod service;
pub mod telemetry;
pub mod transport;

pub use emitter::{Emission, EmitterState, PeriodicEmitter};
pub use service::Service;
