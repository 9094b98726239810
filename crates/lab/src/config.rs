use gatewatch_booking::config::ApiConfig;
use gatewatch_core::config::{env_or, ConfigError};
use gatewatch_notify::ChannelConfig;

/// Lab console configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct LabConfig {
    pub api: ApiConfig,
    pub channel: ChannelConfig,
    /// Emit JSON log lines instead of human-readable ones.
    pub log_json: bool,
    /// Booking to retrieve on start, as `(pnr, last_name)`.
    pub initial_booking: Option<(String, String)>,
}

impl LabConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var         | Default |
    /// |-----------------|---------|
    /// | `LOG_FORMAT`    | `text`  |
    /// | `LAB_PNR`       | unset   |
    /// | `LAB_LAST_NAME` | unset   |
    ///
    /// plus everything read by [`ApiConfig::from_env`] and
    /// [`ChannelConfig::from_env`].
    pub fn from_env() -> Result<Self, ConfigError> {
        let log_json = env_or("LOG_FORMAT", "text").eq_ignore_ascii_case("json");

        let initial_booking = match (std::env::var("LAB_PNR"), std::env::var("LAB_LAST_NAME")) {
            (Ok(pnr), Ok(last_name)) if !pnr.trim().is_empty() && !last_name.trim().is_empty() => {
                Some((pnr, last_name))
            }
            _ => None,
        };

        Ok(Self {
            api: ApiConfig::from_env()?,
            channel: ChannelConfig::from_env()?,
            log_json,
            initial_booking,
        })
    }
}
