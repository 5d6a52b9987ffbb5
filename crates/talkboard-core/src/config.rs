//! Client configuration from the environment.

use crate::relay::EventRelay;
use crate::remote::{RelayResult, WebSocketLog};
use thiserror::Error;
use url::Url;

pub const SERVER_URL_VAR: &str = "TALKBOARD_SERVER_URL";
pub const BOARD_VAR: &str = "TALKBOARD_BOARD";

pub const DEFAULT_SERVER_URL: &str = "ws://localhost:3030/ws";
pub const DEFAULT_BOARD: &str = "main";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid server URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("Board name must not be empty")]
    EmptyBoard,
}

/// Where the client connects and which board it joins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub server_url: Url,
    pub board: String,
}

impl ClientConfig {
    /// Read `TALKBOARD_SERVER_URL` and `TALKBOARD_BOARD`, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let raw_url = lookup(SERVER_URL_VAR).unwrap_or_else(|| DEFAULT_SERVER_URL.to_string());
        let server_url = Url::parse(&raw_url).map_err(|e| ConfigError::InvalidUrl {
            url: raw_url.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(server_url.scheme(), "ws" | "wss") {
            return Err(ConfigError::InvalidUrl {
                url: raw_url,
                reason: "scheme must be ws or wss".to_string(),
            });
        }

        let board = lookup(BOARD_VAR).unwrap_or_else(|| DEFAULT_BOARD.to_string());
        let board = board.trim();
        if board.is_empty() {
            return Err(ConfigError::EmptyBoard);
        }

        Ok(Self {
            server_url,
            board: board.to_string(),
        })
    }

    /// Open a WebSocket-backed relay for this board.
    pub fn connect(&self) -> RelayResult<EventRelay> {
        let mut log = WebSocketLog::new();
        log.connect(self.server_url.as_str(), &self.board)?;
        Ok(EventRelay::new(log))
    }
}
