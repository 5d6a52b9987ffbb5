//! Wire protocol between board clients and the list service.
//!
//! Messages are JSON objects tagged by `type`:
//! ```json
//! { "type": "join", "board": "main" }
//! { "type": "append", "key": "…", "value": { "type": "stroke", … } }
//! { "type": "reset" }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

/// Unique key of an entry in the remote list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteKey(String);

impl RemoteKey {
    /// Generate a fresh, globally unique key.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for RemoteKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl From<&str> for RemoteKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl fmt::Display for RemoteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One entry of the remote list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub key: RemoteKey,
    pub value: Value,
}

/// Messages sent to the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Join a board
    Join { board: String },
    /// Leave the current board
    Leave,
    /// Append a value under a client-generated key
    Append { key: RemoteKey, value: Value },
    /// Empty the board's list
    Reset,
}

/// Messages received from the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Confirm board join with every entry already in the list
    Joined {
        board: String,
        peer_count: usize,
        #[serde(default)]
        entries: Vec<Entry>,
    },
    /// A new entry was appended (sent to every peer, writer included)
    Appended { key: RemoteKey, value: Value },
    /// The writer's append was stored (or was already present)
    Ack { key: RemoteKey },
    /// The writer's append was refused
    Rejected { key: RemoteKey, message: String },
    /// The list was emptied
    Cleared,
    /// Peer joined the board
    PeerJoined { peer_id: String },
    /// Peer left the board
    PeerLeft { peer_id: String },
    /// Error message
    Error { message: String },
}

impl ServerMessage {
    /// Whether a broadcast of this message is also delivered to the peer
    /// that caused it.
    pub fn echoes_to_sender(&self) -> bool {
        matches!(self, ServerMessage::Appended { .. } | ServerMessage::Cleared)
    }
}
