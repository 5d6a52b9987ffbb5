//! TalkBoard Core Library
//!
//! Stroke model, wire format, and event relay for the shared TalkBoard
//! whiteboard, plus the screen logic that sits on top of them.

pub mod auth;
pub mod call;
pub mod canvas;
pub mod codec;
pub mod config;
pub mod protocol;
pub mod relay;
pub mod remote;
pub mod screens;
pub mod session;
pub mod signal;
pub mod stroke;
pub mod style;

#[cfg(test)]
pub(crate) mod test_util;

pub use auth::{AuthError, Credentials, IdentityProvider, MemoryIdentityProvider, UserHandle};
pub use call::{CallRequest, ClientRole, VideoProfile};
pub use canvas::{CanvasView, PointerEvent, PointerId};
pub use codec::{DecodeError, RemoteRecord, StrokeRecord};
pub use config::{ClientConfig, ConfigError};
pub use protocol::{ClientMessage, RemoteKey, ServerMessage};
pub use relay::{EventRelay, PendingWrite, RelayEvent, RelayHandle, Subscription};
pub use remote::{ConnectionState, LogEvent, MemoryHub, RelayError, RemoteLog, WebSocketLog};
pub use screens::{ClearController, LoginController, Screen};
pub use session::BoardSession;
pub use signal::{BoardSignal, SignalBus};
pub use stroke::Stroke;
pub use style::{StrokeColor, StrokeStyle};
