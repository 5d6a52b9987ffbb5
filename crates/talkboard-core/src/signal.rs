//! Local board signals, such as the clear-all button.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::mpsc::{Receiver, Sender, channel};

/// Signals posted by screen controllers to every canvas on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardSignal {
    /// Wipe every stroke locally and empty the remote list.
    ClearAll,
}

/// Receiving end of a [`SignalBus`] subscription.
pub struct SignalReceiver {
    rx: Receiver<BoardSignal>,
}

impl SignalReceiver {
    /// Take every signal posted since the last call (non-blocking).
    pub fn drain(&self) -> Vec<BoardSignal> {
        self.rx.try_iter().collect()
    }
}

/// Fan-out of [`BoardSignal`]s to every subscriber. Cloning the bus shares it.
#[derive(Clone, Default)]
pub struct SignalBus {
    subscribers: Rc<RefCell<Vec<Sender<BoardSignal>>>>,
}

impl SignalBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> SignalReceiver {
        let (tx, rx) = channel();
        self.subscribers.borrow_mut().push(tx);
        SignalReceiver { rx }
    }

    /// Deliver `signal` to every live subscriber. Returns how many received it.
    pub fn post(&self, signal: BoardSignal) -> usize {
        let mut subscribers = self.subscribers.borrow_mut();
        subscribers.retain(|tx| tx.send(signal).is_ok());
        subscribers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_reaches_all_subscribers() {
        let bus = SignalBus::new();
        let a = bus.subscribe();
        let b = bus.clone().subscribe();

        assert_eq!(bus.post(BoardSignal::ClearAll), 2);
        assert_eq!(a.drain(), vec![BoardSignal::ClearAll]);
        assert_eq!(b.drain(), vec![BoardSignal::ClearAll]);
        assert!(a.drain().is_empty());
    }

    #[test]
    fn test_dropped_subscribers_are_pruned() {
        let bus = SignalBus::new();
        let kept = bus.subscribe();
        drop(bus.subscribe());

        assert_eq!(bus.post(BoardSignal::ClearAll), 1);
        assert_eq!(kept.drain().len(), 1);
    }

    #[test]
    fn test_post_without_subscribers() {
        assert_eq!(SignalBus::new().post(BoardSignal::ClearAll), 0);
    }
}
