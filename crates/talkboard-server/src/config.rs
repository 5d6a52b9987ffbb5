//! Server configuration.

use std::net::SocketAddr;
use thiserror::Error;

pub const ADDR_VAR: &str = "TALKBOARD_ADDR";
pub const DEFAULT_ADDR: &str = "0.0.0.0:3030";

#[derive(Debug, Error)]
#[error("Invalid listen address {value:?}: {source}")]
pub struct ConfigError {
    value: String,
    source: std::net::AddrParseError,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub addr: SocketAddr,
}

impl ServerConfig {
    /// Read `TALKBOARD_ADDR`, falling back to `0.0.0.0:3030`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let value = lookup(ADDR_VAR).unwrap_or_else(|| DEFAULT_ADDR.to_string());
        let addr = value
            .trim()
            .parse()
            .map_err(|source| ConfigError { value, source })?;
        Ok(Self { addr })
    }
}
