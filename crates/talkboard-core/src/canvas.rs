//! Canvas view: stroke capture and the strokes shown on screen.

use crate::codec;
use crate::protocol::RemoteKey;
use crate::relay::{RelayEvent, RelayHandle, Subscription};
use crate::signal::{BoardSignal, SignalBus, SignalReceiver};
use crate::stroke::Stroke;
use crate::style::StrokeStyle;
use kurbo::Point;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

/// Identifies one finger or mouse button for the length of a gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PointerId(pub u64);

/// Pointer event type for unified mouse/touch handling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PointerEvent {
    Down { pointer: PointerId, position: Point },
    Move { pointer: PointerId, position: Point },
    Up { pointer: PointerId },
    Cancel { pointer: PointerId },
}

/// The stroke being drawn and the pointer drawing it.
#[derive(Debug, Clone)]
struct ActiveStroke {
    pointer: PointerId,
    stroke: Stroke,
}

/// A whiteboard canvas bound to one relay.
///
/// Local gestures become strokes that are submitted to the relay on release.
/// Remote entries are applied once per key; the keys of strokes this canvas
/// submitted are recorded up front so their echo is ignored.
pub struct CanvasView {
    relay: RelayHandle,
    relay_events: Subscription,
    signals: SignalReceiver,
    style: StrokeStyle,
    active: Option<ActiveStroke>,
    /// Finished strokes in the order they were applied.
    strokes: Vec<Stroke>,
    /// Remote keys already reflected in `strokes`.
    applied: HashSet<RemoteKey>,
    needs_redraw: bool,
}

impl CanvasView {
    /// Create a canvas that draws through `relay` and listens on `signals`.
    pub fn new(relay: RelayHandle, signals: &SignalBus) -> Self {
        let relay_events = relay.subscribe();
        Self {
            relay,
            relay_events,
            signals: signals.subscribe(),
            style: StrokeStyle::default(),
            active: None,
            strokes: Vec::new(),
            applied: HashSet::new(),
            needs_redraw: false,
        }
    }

    pub fn style(&self) -> StrokeStyle {
        self.style
    }

    /// Style for strokes started from now on.
    pub fn set_style(&mut self, style: StrokeStyle) {
        self.style = style;
        self.needs_redraw = true;
    }

    /// Process a pointer event.
    pub fn handle_pointer(&mut self, event: PointerEvent) {
        match event {
            PointerEvent::Down { pointer, position } => {
                if self.active.is_none() {
                    log::debug!("Start a new stroke at {:?}", position);
                    self.active = Some(ActiveStroke {
                        pointer,
                        stroke: Stroke::begin(position, self.style.color),
                    });
                    self.needs_redraw = true;
                }
            }
            PointerEvent::Move { pointer, position } => {
                if let Some(active) = self.active.as_mut().filter(|a| a.pointer == pointer) {
                    active.stroke.add_point(position);
                    self.needs_redraw = true;
                }
            }
            PointerEvent::Up { pointer } => self.finish(pointer, true),
            PointerEvent::Cancel { pointer } => self.finish(pointer, false),
        }
    }

    fn finish(&mut self, pointer: PointerId, submit: bool) {
        if self.active.as_ref().is_none_or(|a| a.pointer != pointer) {
            return;
        }
        let Some(ActiveStroke { stroke, .. }) = self.active.take() else {
            return;
        };

        if submit {
            let key = self.relay.submit(&stroke);
            self.applied.insert(key);
        }
        self.strokes.push(stroke);
        self.needs_redraw = true;
    }

    /// Apply everything the relay and the signal bus delivered since the last
    /// call. Returns whether a redraw is needed.
    pub fn sync(&mut self) -> bool {
        for event in self.relay_events.drain() {
            match event {
                RelayEvent::Appended { key, value } => {
                    self.apply_remote(key, &value);
                }
                RelayEvent::Cleared => {
                    log::info!("Remote list cleared");
                    self.clear_local();
                }
                RelayEvent::WriteFailed { key, message } => {
                    log::warn!("Stroke {} was not saved: {}", key, message);
                }
                RelayEvent::Connected => log::debug!("Relay connected"),
                RelayEvent::Disconnected => log::debug!("Relay disconnected"),
                RelayEvent::Error { message } => log::warn!("Relay error: {}", message),
            }
        }

        // Signals run after relay events: a clear wipes everything pumped this frame.
        for signal in self.signals.drain() {
            match signal {
                BoardSignal::ClearAll => self.clear_all(),
            }
        }

        self.needs_redraw
    }

    /// Apply one remote entry. Returns true if a stroke was added.
    ///
    /// A key already applied is a no-op. Entries that do not decode are
    /// skipped, and their key is recorded so they are not examined again.
    pub fn apply_remote(&mut self, key: RemoteKey, value: &Value) -> bool {
        if self.applied.contains(&key) {
            return false;
        }

        let decoded = codec::decode(value);
        self.applied.insert(key.clone());
        match decoded {
            Ok(stroke) => {
                self.strokes.push(stroke);
                self.needs_redraw = true;
                true
            }
            Err(e) => {
                log::warn!("Skipping remote entry {}: {}", key, e);
                false
            }
        }
    }

    /// Forget every stroke and applied key, including a stroke in progress.
    pub fn clear_local(&mut self) {
        self.strokes.clear();
        self.applied.clear();
        self.active = None;
        self.needs_redraw = true;
    }

    /// Clear locally and empty the remote list for every client.
    pub fn clear_all(&mut self) {
        self.clear_local();
        if let Err(e) = self.relay.reset_all() {
            log::warn!("Failed to reset remote list: {}", e);
        }
    }

    /// Finished strokes, oldest first.
    pub fn strokes(&self) -> &[Stroke] {
        &self.strokes
    }

    pub fn stroke_count(&self) -> usize {
        self.strokes.len()
    }

    /// The stroke currently being drawn, if any.
    pub fn in_progress(&self) -> Option<&Stroke> {
        self.active.as_ref().map(|a| &a.stroke)
    }

    /// Everything to draw, back to front: finished strokes then the stroke
    /// in progress.
    pub fn visible_strokes(&self) -> impl Iterator<Item = &Stroke> {
        self.strokes.iter().chain(self.in_progress())
    }

    pub fn has_applied(&self, key: &RemoteKey) -> bool {
        self.applied.contains(key)
    }

    pub fn applied_keys(&self) -> &HashSet<RemoteKey> {
        &self.applied
    }

    pub fn needs_redraw(&self) -> bool {
        self.needs_redraw
    }

    /// Return and reset the redraw flag.
    pub fn take_redraw(&mut self) -> bool {
        std::mem::take(&mut self.needs_redraw)
    }
}
