use std::future::Future;

use anyhow::Context;
use tracing::{info, warn};

use crate::commands::{self, CommandListener};
use crate::config::AppConfig;
use crate::service::Service;
use crate::transport::BusHandles;

/// Run the service on `bus` until `shutdown` resolves, then stop everything
/// and drain the bus.
///
/// The command listener is subscribed before any emitter starts, so a failed
/// subscription leaves nothing running. Every exit path drains the bus.
pub async fn run_until<F>(cfg: &AppConfig, bus: BusHandles, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()>,
{
    let service = Service::from_config(cfg, bus.publisher.clone())?;

    let listener = match (&bus.subscriber, cfg.commands_enabled) {
        (Some(subscriber), true) => {
            let started = CommandListener::start(
                subscriber.as_ref(),
                &cfg.service_name,
                commands::log_handler(),
            )
            .await;
            match started {
                Ok(listener) => Some(listener),
                Err(err) => {
                    drain(&bus).await;
                    return Err(err).context("cannot subscribe to agent commands");
                }
            }
        }
        _ => None,
    };

    if let Err(err) = service.start().await {
        if let Some(listener) = &listener {
            listener.stop().await;
        }
        drain(&bus).await;
        return Err(err.into());
    }

    shutdown.await;
    info!("shutdown requested");

    if let Some(listener) = &listener {
        listener.stop().await;
    }
    let stopped = service.stop().await;
    let drained = bus.publisher.drain().await;
    if let Err(err) = &drained {
        warn!(error = %err, "bus drain failed");
    }
    stopped?;
    drained.context("cannot drain bus")?;
    Ok(())
}

async fn drain(bus: &BusHandles) {
    if let Err(err) = bus.publisher.drain().await {
        warn!(error = %err, "bus drain failed");
    }
}
