use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use transport_bus::Publisher;

use crate::emitter::{Emission, PeriodicEmitter};
use crate::error::{EmitError, EmitterError};

pub type HeartbeatEmitter = PeriodicEmitter<Heartbeat>;

/// Liveness ping. The edge agent marks a service offline when these stop arriving.
#[derive(Debug, Clone)]
pub struct Heartbeat {
    topic: String,
}

impl Heartbeat {
    pub fn new(service_name: &str) -> Self {
        Self {
            topic: heartbeat_topic(service_name),
        }
    }
}

impl Emission for Heartbeat {
    fn kind(&self) -> &'static str {
        "heartbeat"
    }

    fn topic(&self) -> &str {
        &self.topic
    }

    fn payload(&self) -> Result<Bytes, EmitError> {
        Ok(Bytes::new())
    }
}

pub fn heartbeat_topic(service_name: &str) -> String {
    format!("heartbeat.{service_name}.service")
}

pub fn heartbeat_emitter(
    service_name: &str,
    interval: Duration,
    publisher: Arc<dyn Publisher>,
) -> Result<HeartbeatEmitter, EmitterError> {
    PeriodicEmitter::new(Heartbeat::new(service_name), interval, publisher)
}
