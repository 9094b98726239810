use std::time::Duration;

use gatewatch_core::config::{env_flag, env_or, env_parse, ConfigError};

/// Static bearer token for the demo identity provider; real deployments
/// override it with `API_TOKEN`.
pub const DEMO_TOKEN: &str = "eyJhbGciOiJub25lIiwidHlwIjoiSldUIn0.eyJpc3MiOiJodHRwczovL2lkcC5hY21lLWRlbW8uZXhhbXBsZSIsImF1ZCI6ImFjbWUtYWlybGluZXMtYXBpIiwic3ViIjoiNmU2ZTZjZjEtOWU1MC00YTRlLTlkOGItM2FhOGI0YzRlM2ExIiwic2NvcGUiOiJvcGVuaWQgcHJvZmlsZSBwYXNzZW5nZXI6cmVhZCIsImlhdCI6MTczNzM1ODQwMCwiZXhwIjoxNzM3MzYyMDAwfQ.";

/// Booking service client configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL of the booking service (default: `http://localhost:8080`).
    pub base_url: String,
    /// Pre-issued bearer token.
    pub token: String,
    /// Answer from the built-in fixture when a request fails (default: `true`).
    pub fallback_to_fixture: bool,
    /// Per-request timeout (default: 10s).
    pub request_timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".into(),
            token: DEMO_TOKEN.into(),
            fallback_to_fixture: true,
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl ApiConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                    | Default                 |
    /// |----------------------------|-------------------------|
    /// | `API_BASE_URL`             | `http://localhost:8080` |
    /// | `API_TOKEN`                | demo token              |
    /// | `API_FALLBACK_TO_FIXTURE`  | `true`                  |
    /// | `API_REQUEST_TIMEOUT_SECS` | `10`                    |
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let timeout_secs: u64 = env_parse(
            "API_REQUEST_TIMEOUT_SECS",
            defaults.request_timeout.as_secs(),
            "u64",
        )?;

        Ok(Self {
            base_url: env_or("API_BASE_URL", &defaults.base_url),
            token: env_or("API_TOKEN", &defaults.token),
            fallback_to_fixture: env_flag("API_FALLBACK_TO_FIXTURE", defaults.fallback_to_fixture)?,
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }
}
