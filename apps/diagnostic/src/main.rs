use anyhow::Context;
use diagnostic::config::AppConfig;
use diagnostic::lifecycle;
use diagnostic::telemetry::init_tracing;
use diagnostic::transport;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // a missing .env is normal
    let _ = dotenvy::dotenv();
    let cfg = AppConfig::from_env().context("cannot load config")?;
    init_tracing(&cfg.log_filter);

    info!(
        nats_url = %cfg.nats_url,
        service = %cfg.service_name,
        heartbeat_interval_s = cfg.heartbeat_interval.as_secs(),
        message_interval_s = cfg.message_interval.as_secs(),
        device = %cfg.device_name,
        bus_mode = ?cfg.bus_mode,
        commands_enabled = cfg.commands_enabled,
        "loaded config"
    );

    let bus = transport::build_bus(&cfg)
        .await
        .context("cannot connect to bus")?;
    lifecycle::run_until(&cfg, bus, shutdown_signal()).await?;
    info!("bye");
    Ok(())
}

#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut streams = Vec::new();
    for kind in [
        SignalKind::interrupt(),
        SignalKind::terminate(),
        SignalKind::quit(),
    ] {
        match signal(kind) {
            Ok(stream) => streams.push(stream),
            Err(err) => warn!(error = %err, "cannot install signal handler"),
        }
    }
    if streams.is_empty() {
        let _ = tokio::signal::ctrl_c().await;
        return;
    }
    let waits = streams.iter_mut().map(|s| Box::pin(s.recv()));
    futures::future::select_all(waits).await;
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
