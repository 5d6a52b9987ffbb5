//! Event relay between the canvas and the remote list.
//!
//! The relay appends local strokes to a [`RemoteLog`] and fans out whatever
//! happens to the list to its subscribers. It also keeps track of writes the
//! list has not acknowledged yet, and of writes that failed, so they can be
//! surfaced and retried.

use crate::codec;
use crate::protocol::RemoteKey;
use crate::remote::{ConnectionState, LogEvent, RelayResult, RemoteLog};
use crate::stroke::Stroke;
use serde_json::Value;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::mpsc::{Receiver, Sender, channel};

/// Events delivered to relay subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum RelayEvent {
    /// An entry was appended to the remote list (including our own writes)
    Appended { key: RemoteKey, value: Value },
    /// The remote list was emptied
    Cleared,
    /// One of our writes failed
    WriteFailed { key: RemoteKey, message: String },
    /// Connected to the remote list
    Connected,
    /// Disconnected from the remote list
    Disconnected,
    /// Backend error
    Error { message: String },
}

/// A write that has not been acknowledged, or that failed.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingWrite {
    pub key: RemoteKey,
    pub value: Value,
}

/// Receiving end of a relay subscription.
pub struct Subscription {
    rx: Receiver<RelayEvent>,
}

impl Subscription {
    /// Take every event delivered since the last call (non-blocking).
    pub fn drain(&self) -> Vec<RelayEvent> {
        self.rx.try_iter().collect()
    }
}

/// Relays strokes to and from one remote list.
pub struct EventRelay {
    log: Box<dyn RemoteLog>,
    /// Writes handed to the backend and not yet acknowledged, in submit order.
    pending: Vec<PendingWrite>,
    /// Writes the backend refused or lost.
    failed: Vec<PendingWrite>,
    subscribers: Vec<Sender<RelayEvent>>,
}

impl EventRelay {
    /// Create a relay over a backend connection.
    pub fn new(log: impl RemoteLog + 'static) -> Self {
        Self {
            log: Box::new(log),
            pending: Vec::new(),
            failed: Vec::new(),
            subscribers: Vec::new(),
        }
    }

    /// Register a new subscriber.
    pub fn subscribe(&mut self) -> Subscription {
        let (tx, rx) = channel();
        self.subscribers.push(tx);
        Subscription { rx }
    }

    /// Append a stroke to the remote list.
    ///
    /// The key is returned right away; the write itself completes later. A
    /// failure is logged and the write is kept in [`EventRelay::failed`].
    pub fn submit(&mut self, stroke: &Stroke) -> RemoteKey {
        let key = RemoteKey::generate();
        let write = PendingWrite {
            key: key.clone(),
            value: codec::to_value(stroke),
        };
        self.send(write);
        key
    }

    fn send(&mut self, write: PendingWrite) {
        match self.log.append(&write.key, &write.value) {
            Ok(()) => self.pending.push(write),
            Err(e) => {
                log::warn!("Error saving stroke {}: {}", write.key, e);
                self.publish(RelayEvent::WriteFailed {
                    key: write.key.clone(),
                    message: e.to_string(),
                });
                self.failed.push(write);
            }
        }
    }

    /// Empty the remote list for every client.
    ///
    /// Writes submitted before the reset are forgotten, pending or failed, so
    /// a retry can never bring a cleared stroke back.
    pub fn reset_all(&mut self) -> RelayResult<()> {
        self.log.reset()?;
        self.pending.clear();
        self.failed.clear();
        Ok(())
    }

    /// Resend every failed write under its original key. Returns how many
    /// writes were handed to the backend again.
    pub fn retry_failed(&mut self) -> usize {
        let failed = std::mem::take(&mut self.failed);
        let count = failed.len();
        for write in failed {
            self.send(write);
        }
        count - self.failed.len()
    }

    /// Poll the backend and deliver its events to every subscriber, in the
    /// order the backend reported them.
    pub fn pump(&mut self) {
        for event in self.log.poll_events() {
            match event {
                LogEvent::Appended { key, value } => {
                    self.publish(RelayEvent::Appended { key, value });
                }
                LogEvent::Acked { key } => {
                    self.pending.retain(|w| w.key != key);
                    self.failed.retain(|w| w.key != key);
                }
                LogEvent::Rejected { key, message } => {
                    log::warn!("Error saving stroke {}: {}", key, message);
                    if let Some(index) = self.pending.iter().position(|w| w.key == key) {
                        let write = self.pending.remove(index);
                        self.failed.push(write);
                    }
                    self.publish(RelayEvent::WriteFailed { key, message });
                }
                LogEvent::Cleared => self.publish(RelayEvent::Cleared),
                LogEvent::Connected => {
                    log::info!("Remote list connected");
                    self.publish(RelayEvent::Connected);
                }
                LogEvent::Disconnected => {
                    if !self.pending.is_empty() {
                        log::warn!(
                            "Remote list disconnected with {} unacknowledged writes",
                            self.pending.len()
                        );
                    }
                    self.failed.append(&mut self.pending);
                    self.publish(RelayEvent::Disconnected);
                }
                LogEvent::Error { message } => {
                    log::warn!("Remote list error: {}", message);
                    self.publish(RelayEvent::Error { message });
                }
            }
        }
    }

    fn publish(&mut self, event: RelayEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Writes not acknowledged yet.
    pub fn pending(&self) -> &[PendingWrite] {
        &self.pending
    }

    /// Writes that failed and can be retried.
    pub fn failed(&self) -> &[PendingWrite] {
        &self.failed
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.log.state()
    }
}

/// Shared handle to an [`EventRelay`].
///
/// The application shell creates one relay per board and passes clones of
/// this handle to every consumer. All access happens on the UI thread.
#[derive(Clone)]
pub struct RelayHandle(Rc<RefCell<EventRelay>>);

impl RelayHandle {
    pub fn new(relay: EventRelay) -> Self {
        Self(Rc::new(RefCell::new(relay)))
    }

    pub fn subscribe(&self) -> Subscription {
        self.0.borrow_mut().subscribe()
    }

    pub fn submit(&self, stroke: &Stroke) -> RemoteKey {
        self.0.borrow_mut().submit(stroke)
    }

    pub fn reset_all(&self) -> RelayResult<()> {
        self.0.borrow_mut().reset_all()
    }

    pub fn retry_failed(&self) -> usize {
        self.0.borrow_mut().retry_failed()
    }

    pub fn pump(&self) {
        self.0.borrow_mut().pump()
    }

    pub fn pending(&self) -> Vec<PendingWrite> {
        self.0.borrow().pending().to_vec()
    }

    pub fn failed(&self) -> Vec<PendingWrite> {
        self.0.borrow().failed().to_vec()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.0.borrow().connection_state()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::{MemoryHub, WebSocketLog};
    use crate::style::StrokeColor;
    use kurbo::Point;
    use std::collections::VecDeque;

    fn sample_stroke() -> Stroke {
        let mut stroke = Stroke::begin(Point::new(1.0, 2.0), StrokeColor::black());
        stroke.add_point(Point::new(3.0, 4.0));
        stroke
    }

    /// Backend that accepts every write and reports only scripted events.
    #[derive(Clone, Default)]
    struct ScriptedLog {
        events: Rc<RefCell<VecDeque<LogEvent>>>,
        appends: Rc<RefCell<Vec<RemoteKey>>>,
    }

    impl RemoteLog for ScriptedLog {
        fn append(&mut self, key: &RemoteKey, _value: &Value) -> RelayResult<()> {
            self.appends.borrow_mut().push(key.clone());
            Ok(())
        }

        fn reset(&mut self) -> RelayResult<()> {
            Ok(())
        }

        fn poll_events(&mut self) -> Vec<LogEvent> {
            self.events.borrow_mut().drain(..).collect()
        }

        fn state(&self) -> ConnectionState {
            ConnectionState::Connected
        }
    }

    #[test]
    fn test_submit_returns_key_and_tracks_pending() {
        let hub = MemoryHub::new();
        let mut relay = EventRelay::new(hub.connect());
        let sub = relay.subscribe();

        let key = relay.submit(&sample_stroke());
        assert_eq!(relay.pending().len(), 1);
        assert_eq!(relay.pending()[0].key, key);

        relay.pump();
        assert!(relay.pending().is_empty());
        assert!(relay.failed().is_empty());

        let events = sub.drain();
        assert_eq!(events[0], RelayEvent::Connected);
        assert!(matches!(&events[1], RelayEvent::Appended { key: k, .. } if *k == key));
        assert_eq!(hub.entries()[0].key, key);
    }

    #[test]
    fn test_appended_value_is_encoded_stroke() {
        let hub = MemoryHub::new();
        let mut relay = EventRelay::new(hub.connect());
        let stroke = sample_stroke();
        relay.submit(&stroke);

        let decoded = codec::decode(&hub.entries()[0].value).unwrap();
        assert_eq!(decoded, stroke);
    }

    #[test]
    fn test_rejected_write_is_surfaced_and_retried() {
        let hub = MemoryHub::new();
        let mut relay = EventRelay::new(hub.connect());
        let sub = relay.subscribe();
        hub.set_offline(true);

        let key = relay.submit(&sample_stroke());
        relay.pump();
        assert!(relay.pending().is_empty());
        assert_eq!(relay.failed().len(), 1);
        assert!(
            sub.drain()
                .iter()
                .any(|e| matches!(e, RelayEvent::WriteFailed { key: k, .. } if *k == key))
        );

        hub.set_offline(false);
        assert_eq!(relay.retry_failed(), 1);
        relay.pump();
        assert!(relay.failed().is_empty());
        assert!(relay.pending().is_empty());
        assert_eq!(hub.len(), 1);
        assert_eq!(hub.entries()[0].key, key);
    }

    #[test]
    fn test_unconnected_backend_fails_immediately() {
        let mut relay = EventRelay::new(WebSocketLog::new());
        let sub = relay.subscribe();

        let key = relay.submit(&sample_stroke());
        assert!(relay.pending().is_empty());
        assert_eq!(relay.failed()[0].key, key);
        assert!(matches!(
            sub.drain().as_slice(),
            [RelayEvent::WriteFailed { .. }]
        ));
        assert_eq!(relay.retry_failed(), 0);
        assert_eq!(relay.failed().len(), 1);
    }

    #[test]
    fn test_disconnect_moves_pending_to_failed() {
        let log = ScriptedLog::default();
        let events = log.events.clone();
        let mut relay = EventRelay::new(log);

        let first = relay.submit(&sample_stroke());
        let second = relay.submit(&sample_stroke());
        events.borrow_mut().push_back(LogEvent::Acked { key: first });
        events.borrow_mut().push_back(LogEvent::Disconnected);
        relay.pump();

        assert!(relay.pending().is_empty());
        assert_eq!(relay.failed().len(), 1);
        assert_eq!(relay.failed()[0].key, second);
    }

    #[test]
    fn test_late_ack_clears_failed() {
        let log = ScriptedLog::default();
        let events = log.events.clone();
        let mut relay = EventRelay::new(log);

        let key = relay.submit(&sample_stroke());
        events.borrow_mut().push_back(LogEvent::Disconnected);
        relay.pump();
        assert_eq!(relay.failed().len(), 1);

        events.borrow_mut().push_back(LogEvent::Acked { key });
        relay.pump();
        assert!(relay.failed().is_empty());
    }

    #[test]
    fn test_reset_forgets_unacknowledged_writes() {
        let log = ScriptedLog::default();
        let events = log.events.clone();
        let appends = log.appends.clone();
        let mut relay = EventRelay::new(log);

        relay.submit(&sample_stroke());
        relay.reset_all().unwrap();
        assert!(relay.pending().is_empty());

        events.borrow_mut().push_back(LogEvent::Disconnected);
        relay.pump();
        assert!(relay.failed().is_empty());
        assert_eq!(relay.retry_failed(), 0);
        assert_eq!(appends.borrow().len(), 1);
    }

    #[test]
    fn test_failed_connection_makes_writes_retryable() {
        let mut log = WebSocketLog::new();
        log.connect("ws://127.0.0.1:1/ws", "main").unwrap();
        let mut relay = EventRelay::new(log);

        let key = relay.submit(&sample_stroke());

        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(10);
        while relay.connection_state() != ConnectionState::Disconnected
            && std::time::Instant::now() < deadline
        {
            std::thread::sleep(std::time::Duration::from_millis(20));
            relay.pump();
        }

        assert_eq!(relay.connection_state(), ConnectionState::Disconnected);
        assert!(relay.pending().is_empty());
        assert_eq!(relay.failed().len(), 1);
        assert_eq!(relay.failed()[0].key, key);
    }

    #[test]
    fn test_every_subscriber_gets_events() {
        let hub = MemoryHub::new();
        let mut relay = EventRelay::new(hub.connect());
        let a = relay.subscribe();
        let b = relay.subscribe();
        let dropped = relay.subscribe();
        drop(dropped);

        relay.submit(&sample_stroke());
        relay.pump();
        assert_eq!(a.drain().len(), 2);
        assert_eq!(b.drain().len(), 2);
        assert_eq!(relay.subscribers.len(), 2);
    }

    #[test]
    fn test_reset_all_broadcasts_cleared() {
        let hub = MemoryHub::new();
        let mut writer = EventRelay::new(hub.connect());
        let mut reader = EventRelay::new(hub.connect());
        let sub = reader.subscribe();

        writer.submit(&sample_stroke());
        writer.reset_all().unwrap();
        assert!(hub.is_empty());

        reader.pump();
        let events = sub.drain();
        assert_eq!(events.last(), Some(&RelayEvent::Cleared));
    }

    #[test]
    fn test_handle_shares_one_relay() {
        let hub = MemoryHub::new();
        let handle = RelayHandle::new(EventRelay::new(hub.connect()));
        let other = handle.clone();
        let sub = other.subscribe();

        let key = handle.submit(&sample_stroke());
        assert_eq!(other.pending()[0].key, key);
        other.pump();
        assert!(handle.pending().is_empty());
        assert_eq!(handle.connection_state(), ConnectionState::Connected);
        assert_eq!(sub.drain().len(), 2);
    }
}
