use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use diagnostic::config::AppConfig;
use diagnostic::lifecycle::run_until;
use diagnostic::transport::BusHandles;
use tokio::time::sleep;
use transport_bus::{BusError, BusResult, LocalBus, Publisher, Subscriber, Subscription};

struct RefusingSubscriber;

#[async_trait]
impl Subscriber for RefusingSubscriber {
    async fn subscribe(&self, _subject: &str) -> BusResult<Subscription> {
        Err(BusError::Subscribe("permission denied".into()))
    }
}

fn config() -> AppConfig {
    AppConfig::from_lookup(|key| match key {
        "SERVICE_NAME" => Some("test".into()),
        "HEARTBEAT_INTERVAL_S" => Some("1".into()),
        "MESSAGE_INTERVAL_S" => Some("1".into()),
        _ => None,
    })
    .expect("config")
}

#[test_timeout::tokio_timeout_test(10, paused)]
async fn failed_command_subscription_leaves_nothing_running() {
    let bus = Arc::new(LocalBus::new());
    let mut everything = bus.receiver(">");
    let handles = BusHandles {
        publisher: bus.clone(),
        subscriber: Some(Arc::new(RefusingSubscriber)),
    };

    let result = run_until(&config(), handles, sleep(Duration::from_secs(60))).await;
    let err = result.expect_err("subscription failure must abort the run");
    assert!(err.to_string().contains("agent commands"), "{err:#}");

    sleep(Duration::from_secs(5)).await;
    assert!(everything.try_recv().is_err(), "no emitter may publish");
    let late = bus.publish("events.data", Bytes::new()).await;
    assert!(matches!(late, Err(BusError::Closed)), "bus must be drained");
}

#[test_timeout::tokio_timeout_test(10, paused)]
async fn runs_until_shutdown_then_stops_and_drains() {
    let bus = Arc::new(LocalBus::new());
    let mut heartbeats = bus.receiver("heartbeat.test.service");
    let handles = BusHandles {
        publisher: bus.clone(),
        subscriber: Some(bus.clone()),
    };

    run_until(&config(), handles, sleep(Duration::from_millis(3_500)))
        .await
        .expect("clean run");

    let mut count = 0;
    while heartbeats.try_recv().is_ok() {
        count += 1;
    }
    assert_eq!(count, 3);

    sleep(Duration::from_secs(5)).await;
    assert!(heartbeats.try_recv().is_err(), "emitters must be stopped");
    let late = bus.publish("events.data", Bytes::new()).await;
    assert!(matches!(late, Err(BusError::Closed)));
}
