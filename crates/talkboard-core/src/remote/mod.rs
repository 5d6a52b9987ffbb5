//! Remote ordered list backends.
//!
//! A backend stores `(key, value)` entries in insertion order and reports
//! what happens to the list as [`LogEvent`]s, which are collected and must be
//! polled via [`RemoteLog::poll_events`].

mod memory;
mod websocket;

pub use memory::{MemoryHub, MemoryLog};
pub use websocket::WebSocketLog;

use crate::protocol::RemoteKey;
use serde_json::Value;
use thiserror::Error;

/// Errors reported by remote list backends.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Not connected")]
    NotConnected,
    #[error("Already connected")]
    AlreadyConnected,
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Send failed: {0}")]
    Send(String),
    #[error("Remote list unavailable: {0}")]
    Unavailable(String),
}

/// Result type for backend operations.
pub type RelayResult<T> = Result<T, RelayError>;

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

/// Events from a remote list backend
#[derive(Debug, Clone, PartialEq)]
pub enum LogEvent {
    /// Connected and subscribed to the list
    Connected,
    /// Connection lost
    Disconnected,
    /// An entry was appended, by this client or any other
    Appended { key: RemoteKey, value: Value },
    /// One of this client's writes was stored
    Acked { key: RemoteKey },
    /// One of this client's writes was refused
    Rejected { key: RemoteKey, message: String },
    /// The list was emptied
    Cleared,
    /// Error occurred
    Error { message: String },
}

/// An ordered, append-only remote list shared by every client on a board.
///
/// `append` only queues the write: the outcome arrives later as
/// [`LogEvent::Acked`] or [`LogEvent::Rejected`].
pub trait RemoteLog {
    /// Queue an append of `value` under `key`.
    fn append(&mut self, key: &RemoteKey, value: &Value) -> RelayResult<()>;

    /// Empty the list for every client.
    fn reset(&mut self) -> RelayResult<()>;

    /// Drain pending events (non-blocking).
    fn poll_events(&mut self) -> Vec<LogEvent>;

    /// Current connection state.
    fn state(&self) -> ConnectionState;
}
