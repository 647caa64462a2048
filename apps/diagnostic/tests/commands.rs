use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use diagnostic::commands::{AgentCommand, CommandListener};
use tokio::sync::mpsc;
use transport_bus::{LocalBus, Publisher};

#[test_timeout::tokio_timeout_test(10)]
async fn listener_dispatches_commands_for_its_service() {
    let bus = Arc::new(LocalBus::new());
    let (tx, mut rx) = mpsc::unbounded_channel();
    let listener = CommandListener::start(
        bus.as_ref(),
        "diag",
        Arc::new(move |cmd: AgentCommand| {
            let _ = tx.send(cmd);
        }),
    )
    .await
    .expect("listen");

    bus.publish("commands.other.reboot", Bytes::from_static(b"{}"))
        .await
        .unwrap();
    bus.publish("commands.diag.reboot", Bytes::from_static(br#"{"delay":3}"#))
        .await
        .unwrap();

    let cmd = rx.recv().await.expect("command");
    assert_eq!(cmd.name, "reboot");
    assert_eq!(cmd.payload, serde_json::json!({ "delay": 3 }));

    listener.stop().await;
    listener.stop().await;
    assert!(rx.try_recv().is_err());
}

#[test_timeout::tokio_timeout_test(10)]
async fn nothing_is_dispatched_after_stop() {
    let bus = Arc::new(LocalBus::new());
    let (tx, mut rx) = mpsc::unbounded_channel();
    let listener = CommandListener::start(
        bus.as_ref(),
        "diag",
        Arc::new(move |cmd: AgentCommand| {
            let _ = tx.send(cmd);
        }),
    )
    .await
    .expect("listen");
    listener.stop().await;

    bus.publish("commands.diag.reboot", Bytes::new()).await.unwrap();
    let next = tokio::time::timeout(Duration::from_millis(100), rx.recv()).await;
    // the handler (and its sender) is gone once the loop exits
    assert!(matches!(next, Ok(None)));
}

#[test_timeout::tokio_timeout_test(10)]
async fn drained_bus_refuses_new_listeners() {
    let bus = Arc::new(LocalBus::new());
    bus.drain().await.unwrap();
    let result = CommandListener::start(bus.as_ref(), "diag", diagnostic::commands::log_handler()).await;
    assert!(result.is_err());
}
