//! Relay configuration from environment variables

use secrecy::SecretString;
use std::env;
use std::net::SocketAddr;
use thiserror::Error;

/// Listen address used when `SMTP2GRAPH_LISTEN` is not set
pub const DEFAULT_LISTEN: &str = "0.0.0.0:25";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} not set")]
    Missing(&'static str),

    #[error("Invalid {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// App-only credentials for the Graph API
#[derive(Debug, Clone)]
pub struct GraphCredentials {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: SecretString,
}

impl GraphCredentials {
    /// Load credentials from the environment
    ///
    /// Reads from `.env` file if present. Required variables:
    /// - `TENANT_ID`
    /// - `CLIENT_ID`
    /// - `CLIENT_SECRET`
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load credentials through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|value| !value.is_empty())
                .ok_or(ConfigError::Missing(name))
        };

        Ok(Self {
            tenant_id: required("TENANT_ID")?,
            client_id: required("CLIENT_ID")?,
            client_secret: SecretString::from(required("CLIENT_SECRET")?),
        })
    }
}

/// Listener settings
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub listen: SocketAddr,
}

impl RelayConfig {
    /// Load listener settings from the environment
    ///
    /// Optional (with defaults):
    /// - `SMTP2GRAPH_LISTEN` (default: `0.0.0.0:25`)
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let listen = lookup("SMTP2GRAPH_LISTEN").unwrap_or_else(|| DEFAULT_LISTEN.to_string());

        Ok(Self {
            listen: parse_listen(&listen)?,
        })
    }
}

/// Parse a listen address such as `127.0.0.1:2525`
pub fn parse_listen(value: &str) -> Result<SocketAddr, ConfigError> {
    value.parse().map_err(|e| ConfigError::Invalid {
        name: "SMTP2GRAPH_LISTEN",
        reason: format!("{value}: {e}"),
    })
}
