use std::sync::Arc;

use transport_bus::{BusResult, Publisher, StdoutPublisher, Subscriber};
use transport_nats::NatsPublisher;

use crate::config::{AppConfig, BusMode};

pub struct BusHandles {
    pub publisher: Arc<dyn Publisher>,
    /// `None` when the transport cannot receive (stdout mode).
    pub subscriber: Option<Arc<dyn Subscriber>>,
}

/// Build the bus for the configured mode. Connecting is the only fallible step.
pub async fn build_bus(cfg: &AppConfig) -> BusResult<BusHandles> {
    match cfg.bus_mode {
        BusMode::Nats => {
            let nats = Arc::new(NatsPublisher::connect(&cfg.nats_url).await?);
            Ok(BusHandles {
                publisher: nats.clone(),
                subscriber: Some(nats),
            })
        }
        BusMode::Stdout => Ok(BusHandles {
            publisher: Arc::new(StdoutPublisher::new()),
            subscriber: None,
        }),
    }
}
