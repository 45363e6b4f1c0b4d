//! Centralized server configuration.
//!
//! Strongly-typed configuration loaded via the `config` crate from
//! environment variables, with `__` as the nesting separator
//! (`SESSION__SWEEP_INTERVAL_SECONDS`, `CHANNEL__API_BASE`, ...).

use serde::Deserialize;

/// Top-level server configuration.
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// PostgreSQL database connection URL.
    pub database_url: String,

    /// Socket address the webhook server binds.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Session housekeeping configuration.
    #[serde(default)]
    pub session: SessionSweepConfig,

    /// Messaging-channel delivery configuration.
    pub channel: ChannelConfig,

    /// Notification publishing configuration.
    #[serde(default)]
    pub nats: NatsConfig,
}

/// Housekeeping for the session store and gate.
///
/// Expiry itself is enforced on read; the sweep only reclaims storage for
/// sessions nobody asks about again.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionSweepConfig {
    /// Interval between sweep runs, in seconds.
    #[serde(default = "default_sweep_interval_seconds")]
    pub sweep_interval_seconds: u64,
}

/// Where and how outbound replies are delivered.
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelConfig {
    /// Base URL of the channel's message push API.
    pub api_base: String,

    /// Request timeout in seconds.
    #[serde(default = "default_channel_timeout_seconds")]
    pub timeout_seconds: u64,
}

/// NATS connection for booking/order notifications.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NatsConfig {
    /// NATS server URL. When unset, notifications are logged and dropped.
    #[serde(default)]
    pub url: Option<String>,
}

fn default_listen_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_sweep_interval_seconds() -> u64 {
    300
}

fn default_channel_timeout_seconds() -> u64 {
    10
}

impl Default for SessionSweepConfig {
    fn default() -> Self {
        Self {
            sweep_interval_seconds: default_sweep_interval_seconds(),
        }
    }
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(
                config::Environment::default()
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}
