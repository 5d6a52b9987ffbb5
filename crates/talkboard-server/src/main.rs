//! TalkBoard List Service
//!
//! Keeps one append-only list per board and relays changes to every client
//! joined to that board.
//!
//! ## Protocol
//!
//! Messages are JSON with the following format:
//! ```json
//! { "type": "join", "board": "main" }
//! { "type": "append", "key": "…", "value": { … } }
//! { "type": "reset" }
//! ```

mod board;
mod config;

use axum::{
    Router,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
    routing::get,
};
use board::{AppState, AppendOutcome, Broadcast};
use config::ServerConfig;
use futures_util::{SinkExt, StreamExt, stream::SplitSink};
use std::sync::Arc;
use talkboard_core::protocol::{ClientMessage, ServerMessage};
use tokio::sync::broadcast::{self, error::RecvError};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info, warn};
use uuid::Uuid;

type WsSender = SplitSink<WebSocket, Message>;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "talkboard_server=info,tower_http=info".into()),
        )
        .init();

    let config = ServerConfig::from_env()?;
    let state = Arc::new(AppState::new());

    let app = Router::new()
        .route("/", get(index))
        .route("/ws", get(ws_handler))
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    info!("TalkBoard list service listening on {}", config.addr);
    info!("WebSocket endpoint: ws://{}/ws", config.addr);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// Index page
async fn index() -> &'static str {
    "TalkBoard List Service - Connect via WebSocket at /ws"
}

/// Health check
async fn health() -> &'static str {
    "ok"
}

/// WebSocket upgrade handler
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Serialize and send one message. Returns false if the socket is gone.
async fn send_message(sender: &mut WsSender, msg: &ServerMessage) -> bool {
    match serde_json::to_string(msg) {
        Ok(json) => sender.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            warn!("Failed to serialize {:?}: {}", msg, e);
            true
        }
    }
}

/// Per-connection state.
struct Connection {
    peer_id: String,
    board: Option<String>,
    board_rx: Option<broadcast::Receiver<Broadcast>>,
}

impl Connection {
    fn leave(&mut self, state: &AppState) {
        if let Some(board) = self.board.take() {
            state.leave(&board, &self.peer_id);
            info!("Peer {} left board {}", self.peer_id, board);
        }
        self.board_rx = None;
    }

    /// Apply one client message. Returns false if the socket is gone.
    async fn handle(&mut self, msg: ClientMessage, state: &AppState, sender: &mut WsSender) -> bool {
        match msg {
            ClientMessage::Join { board } => {
                self.leave(state);

                let (rx, entries, peer_count) = state.join(&board, &self.peer_id);
                self.board_rx = Some(rx);
                self.board = Some(board.clone());

                let joined = ServerMessage::Joined {
                    board: board.clone(),
                    peer_count,
                    entries,
                };
                if !send_message(sender, &joined).await {
                    return false;
                }

                state.broadcast(
                    &board,
                    &self.peer_id,
                    ServerMessage::PeerJoined {
                        peer_id: self.peer_id.clone(),
                    },
                );
                info!("Peer {} joined board {} ({} peers)", self.peer_id, board, peer_count);
                true
            }
            ClientMessage::Leave => {
                self.leave(state);
                true
            }
            ClientMessage::Append { key, value } => {
                let reply = match &self.board {
                    None => ServerMessage::Rejected {
                        key,
                        message: "Join a board first".to_string(),
                    },
                    Some(board) => match state.append(board, &self.peer_id, key.clone(), value) {
                        AppendOutcome::Stored => {
                            debug!("Peer {} appended {} to {}", self.peer_id, key, board);
                            ServerMessage::Ack { key }
                        }
                        AppendOutcome::Duplicate => ServerMessage::Ack { key },
                        AppendOutcome::Rejected(message) => {
                            warn!("Rejected append {} from {}: {}", key, self.peer_id, message);
                            ServerMessage::Rejected { key, message }
                        }
                    },
                };
                send_message(sender, &reply).await
            }
            ClientMessage::Reset => match &self.board {
                Some(board) => {
                    let dropped = state.reset(board, &self.peer_id);
                    info!("Peer {} reset board {} ({} entries dropped)", self.peer_id, board, dropped);
                    true
                }
                None => {
                    let err = ServerMessage::Error {
                        message: "Join a board first".to_string(),
                    };
                    send_message(sender, &err).await
                }
            },
        }
    }

    /// Forward one board broadcast. Returns false if the socket is gone.
    async fn forward(
        &mut self,
        received: Result<Broadcast, RecvError>,
        state: &AppState,
        sender: &mut WsSender,
    ) -> bool {
        match received {
            Ok((from, msg)) => {
                if from != self.peer_id || msg.echoes_to_sender() {
                    return send_message(sender, &msg).await;
                }
                true
            }
            Err(RecvError::Lagged(skipped)) => {
                let Some(board) = &self.board else {
                    return true;
                };
                warn!("Peer {} lagged by {} messages, resyncing", self.peer_id, skipped);
                for msg in state.resync(board) {
                    if !send_message(sender, &msg).await {
                        return false;
                    }
                }
                true
            }
            Err(RecvError::Closed) => {
                self.board_rx = None;
                true
            }
        }
    }
}

/// Handle a WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let mut conn = Connection {
        peer_id: Uuid::new_v4().to_string(),
        board: None,
        board_rx: None,
    };
    info!("New connection: {}", conn.peer_id);

    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            // Handle incoming messages from client
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(client_msg) => {
                                if !conn.handle(client_msg, &state, &mut sender).await {
                                    break;
                                }
                            }
                            Err(e) => {
                                warn!("Invalid message from {}: {}", conn.peer_id, e);
                                let err = ServerMessage::Error {
                                    message: format!("Invalid message: {}", e),
                                };
                                if !send_message(&mut sender, &err).await {
                                    break;
                                }
                            }
                        }
                    }
                    Some(Ok(Message::Binary(_))) => {
                        let err = ServerMessage::Error {
                            message: "Binary messages are not supported".to_string(),
                        };
                        if !send_message(&mut sender, &err).await {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        break;
                    }
                    Some(Ok(_)) => {} // Ignore ping/pong
                    Some(Err(e)) => {
                        warn!("WebSocket error for {}: {}", conn.peer_id, e);
                        break;
                    }
                }
            }

            // Handle broadcast messages from the board
            received = async {
                match &mut conn.board_rx {
                    Some(rx) => rx.recv().await,
                    None => {
                        // No board joined, just wait forever
                        std::future::pending::<Result<Broadcast, RecvError>>().await
                    }
                }
            } => {
                if !conn.forward(received, &state, &mut sender).await {
                    break;
                }
            }
        }
    }

    // Cleanup on disconnect
    conn.leave(&state);
    info!("Connection closed: {}", conn.peer_id);
}
