//! One open board: the relay, the signal bus, and the canvas bound to them.

use crate::canvas::CanvasView;
use crate::config::ClientConfig;
use crate::relay::{EventRelay, RelayHandle};
use crate::remote::{RelayResult, RemoteLog};
use crate::screens::ClearController;
use crate::signal::SignalBus;

/// Owns the per-board objects a shell needs and drives them each frame.
pub struct BoardSession {
    relay: RelayHandle,
    signals: SignalBus,
    canvas: CanvasView,
}

impl BoardSession {
    /// Open a session over any remote list backend.
    pub fn new(log: impl RemoteLog + 'static) -> Self {
        let relay = RelayHandle::new(EventRelay::new(log));
        let signals = SignalBus::new();
        let canvas = CanvasView::new(relay.clone(), &signals);
        Self {
            relay,
            signals,
            canvas,
        }
    }

    /// Connect to the configured list service.
    pub fn connect(config: &ClientConfig) -> RelayResult<Self> {
        log::info!("Opening board {} at {}", config.board, config.server_url);
        let relay = RelayHandle::new(config.connect()?);
        let signals = SignalBus::new();
        let canvas = CanvasView::new(relay.clone(), &signals);
        Ok(Self {
            relay,
            signals,
            canvas,
        })
    }

    /// Poll the backend and apply what arrived. Returns whether to redraw.
    pub fn frame(&mut self) -> bool {
        self.relay.pump();
        self.canvas.sync()
    }

    pub fn relay(&self) -> &RelayHandle {
        &self.relay
    }

    pub fn signals(&self) -> &SignalBus {
        &self.signals
    }

    pub fn canvas(&self) -> &CanvasView {
        &self.canvas
    }

    pub fn canvas_mut(&mut self) -> &mut CanvasView {
        &mut self.canvas
    }

    /// A clear-all button wired to this board.
    pub fn clear_button(&self) -> ClearController {
        ClearController::new(&self.signals)
    }
}
