use std::time::Duration;

use crate::error::ConfigError;
use crate::message::DEFAULT_DEVICE_NAME;

pub const DEFAULT_SERVICE_NAME: &str = "custom_service";
const DEFAULT_HEARTBEAT_INTERVAL_S: u64 = 10;
const DEFAULT_MESSAGE_INTERVAL_S: u64 = 60;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub nats_url: String,
    pub service_name: String,
    pub heartbeat_interval: Duration,
    pub message_interval: Duration,
    pub device_name: String,
    pub bus_mode: BusMode,
    pub commands_enabled: bool,
    pub log_filter: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let heartbeat_interval = interval_secs(
            "HEARTBEAT_INTERVAL_S",
            get("HEARTBEAT_INTERVAL_S"),
            DEFAULT_HEARTBEAT_INTERVAL_S,
        )?;
        let message_interval = interval_secs(
            "MESSAGE_INTERVAL_S",
            get("MESSAGE_INTERVAL_S"),
            DEFAULT_MESSAGE_INTERVAL_S,
        )?;
        let bus_mode = match get("BUS_MODE") {
            Some(raw) => BusMode::parse(&raw)?,
            None => BusMode::Nats,
        };
        let commands_enabled = get("COMMANDS_ENABLED")
            .map(|v| matches!(v.as_str(), "1" | "true" | "TRUE" | "yes" | "on"))
            .unwrap_or(true);

        Ok(Self {
            nats_url: get("NATS_URL").unwrap_or_else(|| transport_nats::DEFAULT_URL.into()),
            service_name: get("SERVICE_NAME").unwrap_or_else(|| DEFAULT_SERVICE_NAME.into()),
            heartbeat_interval,
            message_interval,
            device_name: get("DEVICE_NAME").unwrap_or_else(|| DEFAULT_DEVICE_NAME.into()),
            bus_mode,
            commands_enabled,
            log_filter: get("RUST_LOG").unwrap_or_else(|| "info,diagnostic=debug".into()),
        })
    }
}

fn interval_secs(
    key: &'static str,
    raw: Option<String>,
    default: u64,
) -> Result<Duration, ConfigError> {
    let Some(raw) = raw else {
        return Ok(Duration::from_secs(default));
    };
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::InvalidInterval { key, value: raw }),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusMode {
    Nats,
    Stdout,
}

impl BusMode {
    fn parse(raw: &str) -> Result<Self, ConfigError> {
        match raw.to_ascii_lowercase().as_str() {
            "nats" => Ok(BusMode::Nats),
            "stdout" => Ok(BusMode::Stdout),
            _ => Err(ConfigError::UnknownBusMode(raw.to_string())),
        }
    }
}
