use std::time::Duration;

use gatewatch_booking::DeviceInfo;
use gatewatch_core::config::{env_flag, env_or, env_parse, ConfigError};

/// Delay before the simulated gate change when no live channel is available.
pub const DEFAULT_FALLBACK_DELAY: Duration = Duration::from_millis(6500);

/// Notification channel configuration.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Degraded-mode delay (default: 6.5s).
    pub fallback_delay: Duration,
    /// Device metadata sent with session requests and the hello envelope.
    pub device: DeviceInfo,
    /// Send the hello envelope once the transport opens (default: `true`).
    pub send_hello: bool,
    /// Ping at the session's heartbeat interval (default: `true`).
    pub heartbeat: bool,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            fallback_delay: DEFAULT_FALLBACK_DELAY,
            device: DeviceInfo {
                client_type: Some("cli".into()),
                user_agent: Some(default_user_agent()),
            },
            send_hello: true,
            heartbeat: true,
        }
    }
}

impl ChannelConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                     | Default              |
    /// |-----------------------------|----------------------|
    /// | `CHANNEL_FALLBACK_DELAY_MS` | `6500`               |
    /// | `CHANNEL_CLIENT_TYPE`       | `cli`                |
    /// | `CHANNEL_USER_AGENT`        | `gatewatch/<version>`|
    /// | `CHANNEL_SEND_HELLO`        | `true`               |
    /// | `CHANNEL_HEARTBEAT`         | `true`               |
    pub fn from_env() -> Result<Self, ConfigError> {
        let delay_ms: u64 = env_parse(
            "CHANNEL_FALLBACK_DELAY_MS",
            DEFAULT_FALLBACK_DELAY.as_millis() as u64,
            "u64",
        )?;

        Ok(Self {
            fallback_delay: Duration::from_millis(delay_ms),
            device: DeviceInfo {
                client_type: Some(env_or("CHANNEL_CLIENT_TYPE", "cli")),
                user_agent: Some(env_or("CHANNEL_USER_AGENT", &default_user_agent())),
            },
            send_hello: env_flag("CHANNEL_SEND_HELLO", true)?,
            heartbeat: env_flag("CHANNEL_HEARTBEAT", true)?,
        })
    }
}

fn default_user_agent() -> String {
    format!("gatewatch/{}", env!("CARGO_PKG_VERSION"))
}
