use std::collections::HashMap;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, BoxStream, Stream, StreamExt};
use thiserror::Error;
use tokio::sync::broadcast;

mod subject;

pub use subject::subject_matches;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusMessage {
    pub topic: String,
    pub payload: Bytes,
}

#[derive(Debug, Error)]
pub enum BusError {
    #[error("bus channel closed")]
    Closed,
    #[error("bus connect error: {0}")]
    Connect(String),
    #[error("bus publish error: {0}")]
    Publish(String),
    #[error("bus drain error: {0}")]
    Drain(String),
    #[error("bus subscribe error: {0}")]
    Subscribe(String),
}

pub type BusResult<T> = Result<T, BusError>;

/// Outbound half of a bus. Implementations must tolerate concurrent calls.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Send `payload` to `topic`. An empty payload is valid.
    async fn publish(&self, topic: &str, payload: Bytes) -> BusResult<()>;

    /// Flush buffered sends. Called once at shutdown.
    async fn drain(&self) -> BusResult<()>;
}

#[async_trait]
pub trait Subscriber: Send + Sync {
    /// Subscribe to a subject; `*` and `>` wildcards follow NATS rules.
    async fn subscribe(&self, subject: &str) -> BusResult<Subscription>;
}

/// Stream of messages delivered to one subscription.
pub struct Subscription {
    inner: BoxStream<'static, BusMessage>,
}

impl Subscription {
    pub fn new(stream: impl Stream<Item = BusMessage> + Send + 'static) -> Self {
        Self {
            inner: stream.boxed(),
        }
    }

    /// Adapt a broadcast receiver, skipping over lagged messages.
    pub fn from_broadcast(rx: broadcast::Receiver<BusMessage>) -> Self {
        Self::new(stream::unfold(rx, |mut rx| async move {
            loop {
                match rx.recv().await {
                    Ok(msg) => return Some((msg, rx)),
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        }))
    }
}

impl Stream for Subscription {
    type Item = BusMessage;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}

/// Simple in-memory bus for tests and non-transport contexts.
#[derive(Debug, Default)]
pub struct LocalBus {
    topics: parking_lot::RwLock<HashMap<String, broadcast::Sender<BusMessage>>>,
    drained: AtomicBool,
}

impl LocalBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Receiver for every message whose topic matches `pattern`.
    pub fn receiver(&self, pattern: &str) -> broadcast::Receiver<BusMessage> {
        self.sender_for(pattern).subscribe()
    }

    fn sender_for(&self, pattern: &str) -> broadcast::Sender<BusMessage> {
        let mut guard = self.topics.write();
        guard
            .entry(pattern.to_string())
            .or_insert_with(|| broadcast::channel(64).0)
            .clone()
    }

    fn deliver(&self, topic: &str, payload: Bytes) -> BusResult<()> {
        if self.drained.load(Ordering::Acquire) {
            return Err(BusError::Closed);
        }
        let guard = self.topics.read();
        for (pattern, sender) in guard.iter() {
            if subject_matches(pattern, topic) {
                // no receivers is fine; the bus is fire-and-forget
                let _ = sender.send(BusMessage {
                    topic: topic.to_string(),
                    payload: payload.clone(),
                });
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Publisher for LocalBus {
    async fn publish(&self, topic: &str, payload: Bytes) -> BusResult<()> {
        self.deliver(topic, payload)
    }

    async fn drain(&self) -> BusResult<()> {
        self.drained.store(true, Ordering::Release);
        Ok(())
    }
}

#[async_trait]
impl Subscriber for LocalBus {
    async fn subscribe(&self, subject: &str) -> BusResult<Subscription> {
        if self.drained.load(Ordering::Acquire) {
            return Err(BusError::Closed);
        }
        Ok(Subscription::from_broadcast(self.receiver(subject)))
    }
}

/// Publisher that prints every message to stdout. Useful when no broker is around.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutPublisher;

impl StdoutPublisher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Publisher for StdoutPublisher {
    async fn publish(&self, topic: &str, payload: Bytes) -> BusResult<()> {
        println!("[{topic}] published: {}", String::from_utf8_lossy(&payload));
        Ok(())
    }

    async fn drain(&self) -> BusResult<()> {
        Ok(())
    }
}
