use std::sync::Arc;

use tracing::{info, warn};
use transport_bus::Publisher;

use crate::config::AppConfig;
use crate::emitter::EmitterState;
use crate::error::{EmitterError, ServiceError};
use crate::heartbeat::{heartbeat_emitter, HeartbeatEmitter};
use crate::message::{message_emitter, MessageEmitter};

/// Owns the heartbeat and message emitters and drives them as one unit.
///
/// Start order is heartbeat then message; stop runs in reverse.
pub struct Service {
    heartbeat: HeartbeatEmitter,
    message: MessageEmitter,
}

impl Service {
    pub fn new(heartbeat: HeartbeatEmitter, message: MessageEmitter) -> Self {
        Self { heartbeat, message }
    }

    pub fn from_config(cfg: &AppConfig, publisher: Arc<dyn Publisher>) -> Result<Self, EmitterError> {
        let heartbeat =
            heartbeat_emitter(&cfg.service_name, cfg.heartbeat_interval, publisher.clone())?;
        let message = message_emitter(&cfg.device_name, cfg.message_interval, publisher)?;
        Ok(Self::new(heartbeat, message))
    }

    pub fn heartbeat(&self) -> &HeartbeatEmitter {
        &self.heartbeat
    }

    pub fn message(&self) -> &MessageEmitter {
        &self.message
    }

    /// Start both emitters. If the message emitter refuses to start the
    /// heartbeat is stopped again, so a failed start leaves nothing running.
    pub async fn start(&self) -> Result<(), ServiceError> {
        info!("starting service");
        self.heartbeat.start().map_err(ServiceError::Start)?;

        if let Err(err) = self.message.start() {
            if let Err(rollback) = self.heartbeat.stop().await {
                warn!(error = %rollback, "heartbeat did not stop cleanly after failed start");
            }
            return Err(ServiceError::Start(err));
        }
        Ok(())
    }

    /// Stop message then heartbeat. Both are always attempted; the first
    /// failure is returned.
    pub async fn stop(&self) -> Result<(), ServiceError> {
        info!("stopping service");
        let message = self.message.stop().await;
        if let Err(err) = &message {
            warn!(error = %err, "message emitter did not stop cleanly");
        }
        let heartbeat = self.heartbeat.stop().await;
        if let Err(err) = &heartbeat {
            warn!(error = %err, "heartbeat emitter did not stop cleanly");
        }
        message.and(heartbeat).map_err(ServiceError::Stop)
    }

    pub fn is_running(&self) -> bool {
        self.heartbeat.state() == EmitterState::Running
            && self.message.state() == EmitterState::Running
    }
}
