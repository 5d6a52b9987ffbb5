//! In-process remote list shared by several clients.

use super::{ConnectionState, LogEvent, RelayError, RelayResult, RemoteLog};
use crate::protocol::{Entry, RemoteKey};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::mpsc::{Receiver, Sender, channel};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Default)]
struct HubState {
    entries: Vec<Entry>,
    keys: HashSet<RemoteKey>,
    clients: Vec<(usize, Sender<LogEvent>)>,
    next_client: usize,
    offline: bool,
}

impl HubState {
    fn broadcast(&mut self, event: &LogEvent) {
        self.clients.retain(|(_, tx)| tx.send(event.clone()).is_ok());
    }
}

/// An in-memory ordered list for testing and single-process boards.
///
/// Every [`MemoryLog`] obtained from [`MemoryHub::connect`] sees the same
/// list, in the same order.
#[derive(Clone, Default)]
pub struct MemoryHub {
    inner: Arc<Mutex<HubState>>,
}

impl MemoryHub {
    /// Create a new empty hub.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HubState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Connect a new client. Existing entries are replayed to it as
    /// [`LogEvent::Appended`] right after [`LogEvent::Connected`].
    pub fn connect(&self) -> MemoryLog {
        let (tx, rx) = channel();
        let mut state = self.lock();
        let id = state.next_client;
        state.next_client += 1;

        let _ = tx.send(LogEvent::Connected);
        for entry in &state.entries {
            let _ = tx.send(LogEvent::Appended {
                key: entry.key.clone(),
                value: entry.value.clone(),
            });
        }
        state.clients.push((id, tx.clone()));

        MemoryLog {
            hub: self.clone(),
            id,
            tx,
            rx,
            state: ConnectionState::Connecting,
        }
    }

    /// Snapshot of the list.
    pub fn entries(&self) -> Vec<Entry> {
        self.lock().entries.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// Simulate the list being unreachable: appends are rejected and resets fail.
    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }
}

/// One client's connection to a [`MemoryHub`].
pub struct MemoryLog {
    hub: MemoryHub,
    id: usize,
    tx: Sender<LogEvent>,
    rx: Receiver<LogEvent>,
    state: ConnectionState,
}

impl MemoryLog {
    /// Drop this client from the hub. Appends fail afterwards.
    pub fn disconnect(&mut self) {
        self.hub.lock().clients.retain(|(id, _)| *id != self.id);
        let _ = self.tx.send(LogEvent::Disconnected);
    }

    fn is_attached(&self) -> bool {
        self.hub.lock().clients.iter().any(|(id, _)| *id == self.id)
    }
}

impl RemoteLog for MemoryLog {
    fn append(&mut self, key: &RemoteKey, value: &Value) -> RelayResult<()> {
        if !self.is_attached() {
            return Err(RelayError::NotConnected);
        }

        let mut state = self.hub.lock();
        if state.offline {
            let _ = self.tx.send(LogEvent::Rejected {
                key: key.clone(),
                message: "remote list is offline".to_string(),
            });
            return Ok(());
        }

        if state.keys.insert(key.clone()) {
            state.entries.push(Entry {
                key: key.clone(),
                value: value.clone(),
            });
            state.broadcast(&LogEvent::Appended {
                key: key.clone(),
                value: value.clone(),
            });
        }
        let _ = self.tx.send(LogEvent::Acked { key: key.clone() });
        Ok(())
    }

    fn reset(&mut self) -> RelayResult<()> {
        if !self.is_attached() {
            return Err(RelayError::NotConnected);
        }

        let mut state = self.hub.lock();
        if state.offline {
            return Err(RelayError::Unavailable("remote list is offline".to_string()));
        }
        state.entries.clear();
        state.keys.clear();
        state.broadcast(&LogEvent::Cleared);
        Ok(())
    }

    fn poll_events(&mut self) -> Vec<LogEvent> {
        let events: Vec<LogEvent> = self.rx.try_iter().collect();
        for event in &events {
            match event {
                LogEvent::Connected => self.state = ConnectionState::Connected,
                LogEvent::Disconnected => self.state = ConnectionState::Disconnected,
                LogEvent::Error { .. } => self.state = ConnectionState::Error,
                _ => {}
            }
        }
        events
    }

    fn state(&self) -> ConnectionState {
        self.state
    }
}
