//! WebSocket client for the board list service.
//!
//! Uses a background thread for non-blocking operation; events are collected
//! from a channel when polled.

use super::{ConnectionState, LogEvent, RelayError, RelayResult, RemoteLog};
use crate::protocol::{ClientMessage, RemoteKey, ServerMessage};
use serde_json::Value;
use std::sync::mpsc::{Receiver, Sender, TryRecvError, channel};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tungstenite::{Message, connect};
use url::Url;

/// Commands sent to the WebSocket thread.
enum WsCommand {
    Send(String),
    Close,
}

/// First hundred characters of a message, for logging.
fn preview(msg: &str) -> &str {
    match msg.char_indices().nth(100) {
        Some((end, _)) => &msg[..end],
        None => msg,
    }
}

/// Translate a service message into backend events.
pub(crate) fn log_events(msg: ServerMessage) -> Vec<LogEvent> {
    match msg {
        ServerMessage::Joined {
            board,
            peer_count,
            entries,
        } => {
            log::info!(
                "Joined board {} ({} peers, {} entries)",
                board,
                peer_count,
                entries.len()
            );
            std::iter::once(LogEvent::Connected)
                .chain(entries.into_iter().map(|entry| LogEvent::Appended {
                    key: entry.key,
                    value: entry.value,
                }))
                .collect()
        }
        ServerMessage::Appended { key, value } => vec![LogEvent::Appended { key, value }],
        ServerMessage::Ack { key } => vec![LogEvent::Acked { key }],
        ServerMessage::Rejected { key, message } => vec![LogEvent::Rejected { key, message }],
        ServerMessage::Cleared => vec![LogEvent::Cleared],
        ServerMessage::PeerJoined { peer_id } => {
            log::debug!("Peer joined: {}", peer_id);
            Vec::new()
        }
        ServerMessage::PeerLeft { peer_id } => {
            log::debug!("Peer left: {}", peer_id);
            Vec::new()
        }
        ServerMessage::Error { message } => vec![LogEvent::Error { message }],
    }
}

/// Remote list reached over a WebSocket connection to `talkboard-server`.
pub struct WebSocketLog {
    state: ConnectionState,
    /// Channel to send commands to the WebSocket thread.
    cmd_tx: Option<Sender<WsCommand>>,
    /// Channel to receive events from the WebSocket thread.
    event_rx: Option<Receiver<LogEvent>>,
    /// Handle to the WebSocket thread.
    _thread: Option<JoinHandle<()>>,
}

impl WebSocketLog {
    /// Create a new disconnected client.
    pub fn new() -> Self {
        Self {
            state: ConnectionState::Disconnected,
            cmd_tx: None,
            event_rx: None,
            _thread: None,
        }
    }

    /// Connect to the service at `url` and join `board`.
    pub fn connect(&mut self, url: &str, board: &str) -> RelayResult<()> {
        if self.cmd_tx.is_some() {
            return Err(RelayError::AlreadyConnected);
        }

        let parsed_url = Url::parse(url).map_err(|e| RelayError::InvalidUrl(e.to_string()))?;
        if parsed_url.scheme() != "ws" && parsed_url.scheme() != "wss" {
            return Err(RelayError::InvalidUrl(format!(
                "unsupported scheme: {}",
                parsed_url.scheme()
            )));
        }

        let join = serde_json::to_string(&ClientMessage::Join {
            board: board.to_string(),
        })
        .map_err(|e| RelayError::Send(e.to_string()))?;

        self.state = ConnectionState::Connecting;

        let (cmd_tx, cmd_rx) = channel::<WsCommand>();
        let (event_tx, event_rx) = channel::<LogEvent>();
        let url = url.to_string();

        let handle = thread::spawn(move || {
            log::info!("WebSocket thread: connecting to {}", url);

            let (mut socket, response) = match connect(&url) {
                Ok(connected) => connected,
                Err(e) => {
                    log::error!("WebSocket connection failed: {}", e);
                    let _ = event_tx.send(LogEvent::Error {
                        message: format!("Connection failed: {}", e),
                    });
                    let _ = event_tx.send(LogEvent::Disconnected);
                    return;
                }
            };
            log::info!("WebSocket connected, status: {}", response.status());

            // Short read timeout keeps the loop polling the command channel.
            match socket.get_mut() {
                tungstenite::stream::MaybeTlsStream::Plain(tcp) => {
                    let _ = tcp.set_read_timeout(Some(Duration::from_millis(50)));
                    let _ = tcp.set_write_timeout(Some(Duration::from_secs(5)));
                }
                #[allow(unreachable_patterns)]
                _ => {}
            }

            if let Err(e) = socket.send(Message::Text(join)) {
                log::error!("WebSocket join failed: {}", e);
                let _ = event_tx.send(LogEvent::Error {
                    message: format!("Join failed: {}", e),
                });
                let _ = event_tx.send(LogEvent::Disconnected);
                return;
            }

            loop {
                match cmd_rx.try_recv() {
                    Ok(WsCommand::Send(msg)) => {
                        log::debug!("WebSocket sending: {}", preview(&msg));
                        if let Err(e) = socket.send(Message::Text(msg)) {
                            log::error!("WebSocket send error: {}", e);
                            break;
                        }
                    }
                    Ok(WsCommand::Close) => {
                        log::info!("WebSocket close requested");
                        let _ = socket.close(None);
                        break;
                    }
                    Err(TryRecvError::Disconnected) => {
                        log::info!("WebSocket command channel disconnected");
                        break;
                    }
                    Err(TryRecvError::Empty) => {}
                }

                match socket.read() {
                    Ok(Message::Text(txt)) => {
                        log::debug!("WebSocket received: {}", preview(&txt));
                        match serde_json::from_str::<ServerMessage>(&txt) {
                            Ok(server_msg) => {
                                for event in log_events(server_msg) {
                                    let _ = event_tx.send(event);
                                }
                            }
                            Err(e) => log::warn!("Failed to parse server message: {}", e),
                        }
                    }
                    Ok(Message::Ping(data)) => {
                        let _ = socket.send(Message::Pong(data));
                    }
                    Ok(Message::Close(_)) => {
                        log::info!("WebSocket received close frame");
                        break;
                    }
                    Ok(_) => {}
                    Err(tungstenite::Error::Io(ref e))
                        if e.kind() == std::io::ErrorKind::WouldBlock
                            || e.kind() == std::io::ErrorKind::TimedOut => {}
                    Err(e) => {
                        log::error!("WebSocket read error: {}", e);
                        break;
                    }
                }
            }

            log::info!("WebSocket thread exiting");
            let _ = event_tx.send(LogEvent::Disconnected);
        });

        self.cmd_tx = Some(cmd_tx);
        self.event_rx = Some(event_rx);
        self._thread = Some(handle);

        Ok(())
    }

    /// Disconnect from the service.
    pub fn disconnect(&mut self) {
        if let Some(tx) = self.cmd_tx.take() {
            let _ = tx.send(WsCommand::Close);
        }
        self.event_rx = None;
        self._thread = None;
        self.state = ConnectionState::Disconnected;
    }

    fn send(&self, msg: &ClientMessage) -> RelayResult<()> {
        let tx = self.cmd_tx.as_ref().ok_or(RelayError::NotConnected)?;
        let json = serde_json::to_string(msg).map_err(|e| RelayError::Send(e.to_string()))?;
        tx.send(WsCommand::Send(json))
            .map_err(|e| RelayError::Send(e.to_string()))
    }
}

impl Default for WebSocketLog {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for WebSocketLog {
    fn drop(&mut self) {
        self.disconnect();
    }
}

impl RemoteLog for WebSocketLog {
    fn append(&mut self, key: &RemoteKey, value: &Value) -> RelayResult<()> {
        self.send(&ClientMessage::Append {
            key: key.clone(),
            value: value.clone(),
        })
    }

    fn reset(&mut self) -> RelayResult<()> {
        self.send(&ClientMessage::Reset)
    }

    fn poll_events(&mut self) -> Vec<LogEvent> {
        let Some(rx) = self.event_rx.as_ref() else {
            return Vec::new();
        };
        let events: Vec<LogEvent> = rx.try_iter().collect();
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Entry;
    use serde_json::json;

    #[test]
    fn test_joined_replays_entries() {
        let events = log_events(ServerMessage::Joined {
            board: "main".to_string(),
            peer_count: 1,
            entries: vec![
                Entry {
                    key: RemoteKey::from("k1"),
                    value: json!(1),
                },
                Entry {
                    key: RemoteKey::from("k2"),
                    value: json!(2),
                },
            ],
        });
        assert_eq!(
            events,
            vec![
                LogEvent::Connected,
                LogEvent::Appended {
                    key: RemoteKey::from("k1"),
                    value: json!(1)
                },
                LogEvent::Appended {
                    key: RemoteKey::from("k2"),
                    value: json!(2)
                },
            ]
        );
    }

    #[test]
    fn test_peer_presence_is_not_an_event() {
        assert!(log_events(ServerMessage::PeerJoined { peer_id: "p".into() }).is_empty());
        assert!(log_events(ServerMessage::PeerLeft { peer_id: "p".into() }).is_empty());
    }

    #[test]
    fn test_ack_and_reject() {
        let key = RemoteKey::from("k");
        assert_eq!(
            log_events(ServerMessage::Ack { key: key.clone() }),
            vec![LogEvent::Acked { key: key.clone() }]
        );
        assert_eq!(
            log_events(ServerMessage::Rejected {
                key: key.clone(),
                message: "full".into()
            }),
            vec![LogEvent::Rejected {
                key,
                message: "full".into()
            }]
        );
    }

    #[test]
    fn test_not_connected() {
        let mut log = WebSocketLog::new();
        assert_eq!(log.state(), ConnectionState::Disconnected);
        assert!(log.poll_events().is_empty());
        assert!(matches!(
            log.append(&RemoteKey::from("k"), &json!(1)),
            Err(RelayError::NotConnected)
        ));
        assert!(matches!(log.reset(), Err(RelayError::NotConnected)));
    }

    #[test]
    fn test_invalid_url() {
        let mut log = WebSocketLog::new();
        assert!(matches!(
            log.connect("http://localhost:3030/ws", "main"),
            Err(RelayError::InvalidUrl(_))
        ));
        assert!(matches!(
            log.connect("not a url", "main"),
            Err(RelayError::InvalidUrl(_))
        ));
        assert_eq!(log.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_refused_connection_reports_disconnect() {
        let mut log = WebSocketLog::new();
        log.connect("ws://127.0.0.1:1/ws", "main").unwrap();
        assert_eq!(log.state(), ConnectionState::Connecting);

        let mut events = Vec::new();
        let deadline = std::time::Instant::now() + Duration::from_secs(10);
        while !events.contains(&LogEvent::Disconnected) && std::time::Instant::now() < deadline {
            thread::sleep(Duration::from_millis(20));
            events.extend(log.poll_events());
        }

        assert!(matches!(events.first(), Some(LogEvent::Error { .. })));
        assert_eq!(events.last(), Some(&LogEvent::Disconnected));
        assert_eq!(log.state(), ConnectionState::Disconnected);
    }
}
