//! Startup configuration read from the environment.
//!
//! Required values fail fast with a [`ConfigError`] naming the variable.
//! Malformed optional values fall back to defaults with a warning.

use std::time::Duration;

use thiserror::Error;

use crate::constants::{DEFAULT_CHANNEL_NAME, DEFAULT_POLL_INTERVAL_SECS, MAX_POLL_INTERVAL_SECS};
use crate::env_config::parse_with_default;

pub const ENV_STORE: &str = "TABLECALL_STORE";
pub const ENV_DATABASE_URL: &str = "TABLECALL_DATABASE_URL";
pub const ENV_CHANNEL: &str = "TABLECALL_CHANNEL";
pub const ENV_CHANNEL_NAME: &str = "TABLECALL_CHANNEL_NAME";
pub const ENV_RELAY_URL: &str = "TABLECALL_RELAY_URL";
pub const ENV_RELAY_KEY: &str = "TABLECALL_RELAY_KEY";
pub const ENV_RELAY_CLUSTER: &str = "TABLECALL_RELAY_CLUSTER";
pub const ENV_POLL_INTERVAL_SECS: &str = "TABLECALL_POLL_INTERVAL_SECS";
pub const ENV_AWAIT_DURABLE_WRITE: &str = "TABLECALL_AWAIT_DURABLE_WRITE";
pub const ENV_SERVER_URL: &str = "TABLECALL_SERVER_URL";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be set: {reason}")]
    Missing { var: &'static str, reason: &'static str },

    #[error("{var} has invalid value '{value}': {reason}")]
    Invalid { var: &'static str, value: String, reason: &'static str },
}

/// Where call records are persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    Postgres { url: String },
    Memory,
}

/// Which broadcast transport gateways publish on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelConfig {
    /// In-process fan-out only (served to remote clients over SSE).
    Local,
    /// External pub/sub relay reached over HTTP.
    Relay { url: String, key: String, cluster: Option<String> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub store: StoreConfig,
    pub channel: ChannelConfig,
    pub channel_name: String,
    pub poll_interval: Duration,
    pub await_durable_write: bool,
    /// Running server whose event stream feeds views in other processes.
    pub server_url: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());

        let store = match get(ENV_STORE).as_deref().unwrap_or("postgres") {
            "postgres" => StoreConfig::Postgres {
                url: get(ENV_DATABASE_URL).ok_or(ConfigError::Missing {
                    var: ENV_DATABASE_URL,
                    reason: "the durable call store is PostgreSQL",
                })?,
            },
            "memory" => StoreConfig::Memory,
            other => {
                return Err(ConfigError::Invalid {
                    var: ENV_STORE,
                    value: other.to_owned(),
                    reason: "expected 'postgres' or 'memory'",
                });
            },
        };

        let channel = match get(ENV_CHANNEL).as_deref().unwrap_or("local") {
            "local" => ChannelConfig::Local,
            "relay" => ChannelConfig::Relay {
                url: get(ENV_RELAY_URL).ok_or(ConfigError::Missing {
                    var: ENV_RELAY_URL,
                    reason: "the broadcast channel is a relay",
                })?,
                key: get(ENV_RELAY_KEY).ok_or(ConfigError::Missing {
                    var: ENV_RELAY_KEY,
                    reason: "the relay requires credentials",
                })?,
                cluster: get(ENV_RELAY_CLUSTER),
            },
            other => {
                return Err(ConfigError::Invalid {
                    var: ENV_CHANNEL,
                    value: other.to_owned(),
                    reason: "expected 'local' or 'relay'",
                });
            },
        };

        let poll_secs = parse_with_default(
            ENV_POLL_INTERVAL_SECS,
            get(ENV_POLL_INTERVAL_SECS),
            DEFAULT_POLL_INTERVAL_SECS,
        );
        if poll_secs == 0 || poll_secs > MAX_POLL_INTERVAL_SECS {
            return Err(ConfigError::Invalid {
                var: ENV_POLL_INTERVAL_SECS,
                value: poll_secs.to_string(),
                reason: "must be between 1 and 3600 seconds",
            });
        }

        let server_url = get(ENV_SERVER_URL);
        if let Some(url) = &server_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::Invalid {
                    var: ENV_SERVER_URL,
                    value: url.clone(),
                    reason: "expected an http:// or https:// URL",
                });
            }
        }

        Ok(Self {
            store,
            channel,
            channel_name: get(ENV_CHANNEL_NAME).unwrap_or_else(|| DEFAULT_CHANNEL_NAME.to_owned()),
            poll_interval: Duration::from_secs(poll_secs),
            await_durable_write: parse_with_default(
                ENV_AWAIT_DURABLE_WRITE,
                get(ENV_AWAIT_DURABLE_WRITE),
                false,
            ),
            server_url,
        })
    }
}
