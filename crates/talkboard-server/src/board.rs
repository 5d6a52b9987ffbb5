//! Board state shared by every connection.

use dashmap::DashMap;
use serde_json::Value;
use std::collections::HashSet;
use talkboard_core::protocol::{Entry, RemoteKey, ServerMessage};
use tokio::sync::broadcast;

pub const CHANNEL_CAPACITY: usize = 256;

/// A broadcast message and the peer that caused it.
pub type Broadcast = (String, ServerMessage);

/// Outcome of an append request.
#[derive(Debug, Clone, PartialEq)]
pub enum AppendOutcome {
    /// Stored and broadcast.
    Stored,
    /// Key already present; nothing changed.
    Duplicate,
    /// Refused with a reason for the writer.
    Rejected(String),
}

/// One named board: an append-only list and its peers.
struct Board {
    /// Broadcast channel for this board
    tx: broadcast::Sender<Broadcast>,
    /// Connected peer IDs
    peers: HashSet<String>,
    /// Entries in insertion order
    entries: Vec<Entry>,
    keys: HashSet<RemoteKey>,
}

impl Board {
    fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            tx,
            peers: HashSet::new(),
            entries: Vec::new(),
            keys: HashSet::new(),
        }
    }

    fn send(&self, from: &str, msg: ServerMessage) {
        // No receivers is fine
        let _ = self.tx.send((from.to_string(), msg));
    }
}

/// Shared application state
pub struct AppState {
    /// Boards live for the life of the process
    boards: DashMap<String, Board>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub fn new() -> Self {
        Self {
            boards: DashMap::new(),
        }
    }

    /// Add a peer to a board. Returns its receiver, the current list, and
    /// the peer count. The snapshot and subscription are taken together so
    /// the peer sees every later change exactly once.
    pub fn join(&self, board: &str, peer_id: &str) -> (broadcast::Receiver<Broadcast>, Vec<Entry>, usize) {
        let mut entry = self.boards.entry(board.to_string()).or_insert_with(Board::new);
        entry.peers.insert(peer_id.to_string());
        let rx = entry.tx.subscribe();
        (rx, entry.entries.clone(), entry.peers.len())
    }

    /// Remove a peer and announce it to the others.
    pub fn leave(&self, board: &str, peer_id: &str) {
        if let Some(mut entry) = self.boards.get_mut(board) {
            if entry.peers.remove(peer_id) {
                entry.send(
                    peer_id,
                    ServerMessage::PeerLeft {
                        peer_id: peer_id.to_string(),
                    },
                );
            }
        }
    }

    /// Append `value` under `key` and broadcast it to every peer.
    pub fn append(&self, board: &str, from: &str, key: RemoteKey, value: Value) -> AppendOutcome {
        if value.is_null() {
            return AppendOutcome::Rejected("Entry value must not be null".to_string());
        }
        let Some(mut entry) = self.boards.get_mut(board) else {
            return AppendOutcome::Rejected(format!("Unknown board {}", board));
        };
        if !entry.keys.insert(key.clone()) {
            return AppendOutcome::Duplicate;
        }

        entry.entries.push(Entry {
            key: key.clone(),
            value: value.clone(),
        });
        entry.send(from, ServerMessage::Appended { key, value });
        AppendOutcome::Stored
    }

    /// Empty the board and broadcast `cleared`. Returns how many entries were dropped.
    pub fn reset(&self, board: &str, from: &str) -> usize {
        let Some(mut entry) = self.boards.get_mut(board) else {
            return 0;
        };
        let dropped = entry.entries.len();
        entry.entries.clear();
        entry.keys.clear();
        entry.send(from, ServerMessage::Cleared);
        dropped
    }

    /// Announce a message to the board's peers.
    pub fn broadcast(&self, board: &str, from: &str, msg: ServerMessage) {
        if let Some(entry) = self.boards.get(board) {
            entry.send(from, msg);
        }
    }

    /// Current list of a board.
    pub fn entries(&self, board: &str) -> Vec<Entry> {
        self.boards
            .get(board)
            .map(|entry| entry.entries.clone())
            .unwrap_or_default()
    }

    /// Messages that bring a lagging peer back in line with the list.
    pub fn resync(&self, board: &str) -> Vec<ServerMessage> {
        std::iter::once(ServerMessage::Cleared)
            .chain(
                self.entries(board)
                    .into_iter()
                    .map(|e| ServerMessage::Appended {
                        key: e.key,
                        value: e.value,
                    }),
            )
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn drain(rx: &mut broadcast::Receiver<Broadcast>) -> Vec<Broadcast> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(msg);
        }
        out
    }

    #[test]
    fn test_append_broadcasts_to_writer() {
        let state = AppState::new();
        let (mut rx, entries, count) = state.join("main", "alice");
        assert!(entries.is_empty());
        assert_eq!(count, 1);

        let outcome = state.append("main", "alice", "k1".into(), json!({"type": "stroke"}));
        assert_eq!(outcome, AppendOutcome::Stored);

        let received = drain(&mut rx);
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].0, "alice");
        assert!(matches!(received[0].1, ServerMessage::Appended { .. }));
        assert!(received[0].1.echoes_to_sender());
    }

    #[test]
    fn test_duplicate_key_not_appended() {
        let state = AppState::new();
        let (mut rx, _, _) = state.join("main", "alice");

        state.append("main", "alice", "k1".into(), json!(1));
        let outcome = state.append("main", "alice", "k1".into(), json!(2));
        assert_eq!(outcome, AppendOutcome::Duplicate);
        assert_eq!(state.entries("main").len(), 1);
        assert_eq!(drain(&mut rx).len(), 1);
    }

    #[test]
    fn test_late_joiner_gets_replay() {
        let state = AppState::new();
        state.join("main", "alice");
        state.append("main", "alice", "k1".into(), json!(1));
        state.append("main", "alice", "k2".into(), json!(2));

        let (_, entries, count) = state.join("main", "bob");
        assert_eq!(count, 2);
        let keys: Vec<_> = entries.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["k1", "k2"]);
    }

    #[test]
    fn test_reset_clears_and_broadcasts() {
        let state = AppState::new();
        let (mut rx, _, _) = state.join("main", "alice");
        state.append("main", "alice", "k1".into(), json!(1));

        assert_eq!(state.reset("main", "bob"), 1);
        assert!(state.entries("main").is_empty());
        let received = drain(&mut rx);
        assert_eq!(received.last().map(|m| &m.1), Some(&ServerMessage::Cleared));

        // Keys are forgotten with the list.
        assert_eq!(
            state.append("main", "alice", "k1".into(), json!(1)),
            AppendOutcome::Stored
        );
    }

    #[test]
    fn test_rejections() {
        let state = AppState::new();
        assert!(matches!(
            state.append("nowhere", "alice", "k1".into(), json!(1)),
            AppendOutcome::Rejected(_)
        ));
        state.join("main", "alice");
        assert!(matches!(
            state.append("main", "alice", "k1".into(), Value::Null),
            AppendOutcome::Rejected(_)
        ));
    }

    #[test]
    fn test_boards_are_isolated_and_persist() {
        let state = AppState::new();
        state.join("a", "alice");
        state.join("b", "bob");
        state.append("a", "alice", "k1".into(), json!(1));

        assert_eq!(state.entries("a").len(), 1);
        assert!(state.entries("b").is_empty());

        state.leave("a", "alice");
        assert_eq!(state.entries("a").len(), 1);
    }

    #[test]
    fn test_leave_announces_peer_left() {
        let state = AppState::new();
        let (mut rx, _, _) = state.join("main", "alice");
        state.join("main", "bob");

        state.leave("main", "bob");
        state.leave("main", "bob");
        let received = drain(&mut rx);
        assert_eq!(received.len(), 1);
        assert_eq!(
            received[0].1,
            ServerMessage::PeerLeft {
                peer_id: "bob".into()
            }
        );
    }

    #[test]
    fn test_resync_messages() {
        let state = AppState::new();
        state.join("main", "alice");
        state.append("main", "alice", "k1".into(), json!(1));

        let messages = state.resync("main");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0], ServerMessage::Cleared);
        assert!(matches!(&messages[1], ServerMessage::Appended { key, .. } if key.as_str() == "k1"));
    }
}
