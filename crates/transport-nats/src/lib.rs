use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use tracing::{debug, info};
use transport_bus::{BusError, BusMessage, BusResult, Publisher, Subscriber, Subscription};

pub const DEFAULT_URL: &str = "nats://localhost:4222";

/// Bus adapter backed by a NATS connection.
#[derive(Clone, Debug)]
pub struct NatsPublisher {
    client: async_nats::Client,
}

impl NatsPublisher {
    pub async fn connect(url: &str) -> BusResult<Self> {
        let client = async_nats::connect(url)
            .await
            .map_err(|e| BusError::Connect(format!("{url}: {e}")))?;
        info!(url = %url, "connected to nats");
        Ok(Self { client })
    }

    pub fn from_client(client: async_nats::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Publisher for NatsPublisher {
    async fn publish(&self, topic: &str, payload: Bytes) -> BusResult<()> {
        self.client
            .publish(topic.to_string(), payload)
            .await
            .map_err(|e| BusError::Publish(e.to_string()))
    }

    async fn drain(&self) -> BusResult<()> {
        debug!("flushing nats connection");
        self.client
            .flush()
            .await
            .map_err(|e| BusError::Drain(e.to_string()))
    }
}

#[async_trait]
impl Subscriber for NatsPublisher {
    async fn subscribe(&self, subject: &str) -> BusResult<Subscription> {
        let sub = self
            .client
            .subscribe(subject.to_string())
            .await
            .map_err(|e| BusError::Subscribe(e.to_string()))?;
        Ok(Subscription::new(sub.map(|msg| BusMessage {
            topic: msg.subject.to_string(),
            payload: msg.payload,
        })))
    }
}
