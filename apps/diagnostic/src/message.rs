use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use rand::Rng;
use serde::{Deserialize, Serialize};
use transport_bus::Publisher;

use crate::emitter::{Emission, PeriodicEmitter};
use crate::error::{EmitError, EmitterError};

pub const TOPIC_DATA: &str = "events.data";
pub const DEFAULT_DEVICE_NAME: &str = "cpt:device:123:temperature";
/// Readings are drawn from `0..VALUE_CEILING`.
pub const VALUE_CEILING: u32 = 100;

pub type MessageEmitter = PeriodicEmitter<TelemetryMessage>;

/// Synthetic telemetry sample published on [`TOPIC_DATA`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reading {
    pub name: String,
    /// Unix seconds.
    pub time: i64,
    pub value: u32,
}

impl Reading {
    pub fn sample(name: &str) -> Self {
        Self {
            name: name.to_string(),
            time: chrono::Utc::now().timestamp(),
            value: rand::thread_rng().gen_range(0..VALUE_CEILING),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TelemetryMessage {
    device: String,
}

impl TelemetryMessage {
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
        }
    }

    pub fn device(&self) -> &str {
        &self.device
    }
}

impl Default for TelemetryMessage {
    fn default() -> Self {
        Self::new(DEFAULT_DEVICE_NAME)
    }
}

impl Emission for TelemetryMessage {
    fn kind(&self) -> &'static str {
        "message"
    }

    fn topic(&self) -> &str {
        TOPIC_DATA
    }

    fn payload(&self) -> Result<Bytes, EmitError> {
        let reading = Reading::sample(&self.device);
        let bytes = serde_json::to_vec(&reading)?;
        Ok(Bytes::from(bytes))
    }
}

pub fn message_emitter(
    device: &str,
    interval: Duration,
    publisher: Arc<dyn Publisher>,
) -> Result<MessageEmitter, EmitterError> {
    PeriodicEmitter::new(TelemetryMessage::new(device), interval, publisher)
}

#[cfg(test)]
mod tests {
    use super::*;
    use transport_bus::LocalBus;

    #[test]
    fn payload_is_a_well_formed_reading() {
        let message = TelemetryMessage::default();
        let before = chrono::Utc::now().timestamp();
        let payload = message.payload().expect("payload");
        let reading: Reading = serde_json::from_slice(&payload).expect("json reading");

        assert_eq!(reading.name, DEFAULT_DEVICE_NAME);
        assert!(reading.value < VALUE_CEILING);
        assert!(reading.time >= before);
    }

    #[test]
    fn payload_uses_the_wire_field_names() {
        let payload = TelemetryMessage::new("dev").payload().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&payload).unwrap();
        let object = value.as_object().expect("object");
        let mut keys: Vec<&str> = object.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, ["name", "time", "value"]);
        assert_eq!(object["name"], "dev");
    }

    #[test]
    fn values_stay_in_range() {
        let message = TelemetryMessage::default();
        for _ in 0..500 {
            let reading: Reading = serde_json::from_slice(&message.payload().unwrap()).unwrap();
            assert!(reading.value < VALUE_CEILING);
        }
    }

    #[test_timeout::tokio_timeout_test(10, paused)]
    async fn readings_are_published_to_events_data() {
        let bus = Arc::new(LocalBus::new());
        let mut rx = bus.receiver(TOPIC_DATA);
        let emitter =
            message_emitter("sensor:1", Duration::from_secs(60), bus.clone()).expect("emitter");
        emitter.start().expect("start");

        tokio::time::sleep(Duration::from_secs(60 * 3 + 30)).await;
        emitter.stop().await.expect("stop");

        let mut last_time = i64::MIN;
        for _ in 0..3 {
            let msg = rx.try_recv().expect("reading");
            let reading: Reading = serde_json::from_slice(&msg.payload).expect("decode");
            assert_eq!(reading.name, "sensor:1");
            assert!(reading.value < VALUE_CEILING);
            assert!(reading.time >= last_time);
            last_time = reading.time;
        }
        assert!(rx.try_recv().is_err());
    }
}
