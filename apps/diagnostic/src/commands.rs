//! Commands sent by the edge agent on `commands.<service>.<name>`.

use std::sync::Arc;

use futures::StreamExt;
use serde_json::Value;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};
use transport_bus::{BusMessage, BusResult, Subscriber};

pub type CommandHandler = Arc<dyn Fn(AgentCommand) + Send + Sync>;

#[derive(Debug, Clone, PartialEq)]
pub struct AgentCommand {
    /// Subject with the `commands.<service>.` prefix removed.
    pub name: String,
    pub payload: Value,
}

impl AgentCommand {
    pub fn from_message(service_name: &str, msg: &BusMessage) -> Self {
        let prefix = format!("commands.{service_name}.");
        let name = msg
            .topic
            .strip_prefix(prefix.as_str())
            .unwrap_or(&msg.topic)
            .to_string();
        let payload = if msg.payload.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&msg.payload).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&msg.payload).into_owned())
            })
        };
        Self { name, payload }
    }
}

pub fn commands_subject(service_name: &str) -> String {
    format!("commands.{service_name}.>")
}

/// Handler that only logs what arrived.
pub fn log_handler() -> CommandHandler {
    Arc::new(|cmd: AgentCommand| {
        info!(command = %cmd.name, payload = %cmd.payload, "received command");
    })
}

pub struct CommandListener {
    cancel: CancellationToken,
    task: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

impl CommandListener {
    /// Subscribe to the service's command subject and dispatch each message to `handler`.
    pub async fn start(
        subscriber: &dyn Subscriber,
        service_name: &str,
        handler: CommandHandler,
    ) -> BusResult<Self> {
        let subject = commands_subject(service_name);
        let mut subscription = subscriber.subscribe(&subject).await?;
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let service = service_name.to_string();
        let span = info_span!("commands", service = %service_name);

        let handle = tokio::spawn(
            async move {
                loop {
                    let msg = tokio::select! {
                        biased;
                        _ = token.cancelled() => break,
                        next = subscription.next() => match next {
                            Some(msg) => msg,
                            None => {
                                debug!("command subscription closed");
                                break;
                            }
                        },
                    };
                    handler(AgentCommand::from_message(&service, &msg));
                }
            }
            .instrument(span),
        );

        info!(subject = %subject, "listening for agent commands");
        Ok(Self {
            cancel,
            task: tokio::sync::Mutex::new(Some(handle)),
        })
    }

    /// Cancel the listener and wait for its loop to exit. Idempotent.
    pub async fn stop(&self) {
        self.cancel.cancel();
        let mut slot = self.task.lock().await;
        if let Some(handle) = slot.as_mut() {
            if let Err(err) = handle.await {
                warn!(error = %err, "command listener did not exit cleanly");
            }
            *slot = None;
            info!("command listener stopped");
        }
    }
}

impl Drop for CommandListener {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn message(topic: &str, payload: &'static [u8]) -> BusMessage {
        BusMessage {
            topic: topic.to_string(),
            payload: Bytes::from_static(payload),
        }
    }

    #[test]
    fn strips_service_prefix_and_decodes_json() {
        let cmd = AgentCommand::from_message(
            "diag",
            &message("commands.diag.config.set", br#"{"interval":5}"#),
        );
        assert_eq!(cmd.name, "config.set");
        assert_eq!(cmd.payload, serde_json::json!({ "interval": 5 }));
    }

    #[test]
    fn non_json_payload_becomes_a_string() {
        let cmd = AgentCommand::from_message("diag", &message("commands.diag.echo", b"hello"));
        assert_eq!(cmd.payload, Value::String("hello".into()));
    }

    #[test]
    fn empty_payload_is_null() {
        let cmd = AgentCommand::from_message("diag", &message("commands.diag.reboot", b""));
        assert_eq!(cmd.name, "reboot");
        assert_eq!(cmd.payload, Value::Null);
    }

    #[test]
    fn subject_covers_every_command() {
        assert_eq!(commands_subject("diag"), "commands.diag.>");
    }
}
