//! SketchRoom WebSocket Relay Server
//!
//! A relay that fans drawing and cursor messages out to the other members of
//! a room, and replays the room's drawing history to whoever joins.
//!
//! ## Protocol
//!
//! Clients connect to `/ws?room=<id>` (no room means `general`) and exchange
//! JSON text frames:
//! ```json
//! { "type": "draw_line", "data": { "x0": 10, "y0": 10, "x1": 50, "y1": 10, "color": "#ef4444" } }
//! { "type": "cursor_move", "data": { "userId": "k3x9q2w7z", "x": 120, "y": 48 } }
//! { "type": "clear_board" }
//! ```
//! On join the server sends `{ "type": "history", "data": [...] }` if the room
//! has any segments.

mod room;

use axum::{
    Router,
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use futures_util::{SinkExt, StreamExt};
use room::RoomRegistry;
use serde::Deserialize;
use sketchroom_core::RoomId;
use std::{net::SocketAddr, sync::Arc};
use tokio::sync::broadcast;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Room used when a client does not name one.
const DEFAULT_ROOM: &str = "general";
const DEFAULT_PORT: u16 = 8080;

/// Query parameters of the websocket endpoint.
#[derive(Debug, Deserialize)]
struct WsParams {
    room: Option<String>,
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sketchroom_server=info,tower_http=info".into()),
        )
        .init();

    let port = match std::env::var("PORT") {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("Ignoring invalid PORT {:?}, using {}", raw, DEFAULT_PORT);
            DEFAULT_PORT
        }),
        Err(_) => DEFAULT_PORT,
    };

    let state = Arc::new(RoomRegistry::new());

    let app = Router::new()
        .route("/", get(index))
        .route("/ws", get(ws_handler))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("SketchRoom relay server listening on {}", addr);
    info!("WebSocket endpoint: ws://localhost:{}/ws?room=<id>", port);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await
}

/// Index page
async fn index() -> &'static str {
    "SketchRoom Relay Server - Connect via WebSocket at /ws?room=<id>"
}

/// Health check
async fn health() -> &'static str {
    "ok"
}

/// WebSocket upgrade handler
async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsParams>,
    State(state): State<Arc<RoomRegistry>>,
) -> Response {
    let room = match params.room.as_deref().map(str::trim) {
        None | Some("") => DEFAULT_ROOM.to_string(),
        Some(raw) => match RoomId::parse(raw) {
            Ok(room) => room.to_string(),
            Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
        },
    };
    ws.on_upgrade(move |socket| handle_socket(socket, room, state))
}

/// Handle a WebSocket connection
async fn handle_socket(socket: WebSocket, room: String, state: Arc<RoomRegistry>) {
    let peer_id = Uuid::new_v4().to_string();

    let joined = match state.join(&room, &peer_id) {
        Ok(joined) => joined,
        Err(e) => {
            warn!("Peer {} could not join room {}: {}", peer_id, room, e);
            state.leave(&room, &peer_id);
            return;
        }
    };
    info!("Peer {} joined room {} ({} peers)", peer_id, room, joined.peer_count);

    let (mut sender, mut receiver) = socket.split();
    let mut room_rx = joined.rx;

    if let Some(history) = joined.history {
        if sender.send(Message::Text(history.into())).await.is_err() {
            state.leave(&room, &peer_id);
            return;
        }
    }

    loop {
        tokio::select! {
            // Handle incoming messages from client
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if let Err(e) = state.relay(&room, &peer_id, text.as_str()) {
                            debug!("Ignoring frame from {}: {}", peer_id, e);
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        break;
                    }
                    Some(Ok(_)) => {} // Ignore binary and ping/pong
                    Some(Err(e)) => {
                        warn!("WebSocket error for {}: {}", peer_id, e);
                        break;
                    }
                }
            }

            // Handle broadcast messages from room
            msg = room_rx.recv() => {
                match msg {
                    Ok(relayed) => {
                        // Don't echo back to sender
                        if let Some(text) = room::outbound_for(&peer_id, relayed) {
                            if sender.send(Message::Text(text.into())).await.is_err() {
                                break;
                            }
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("Peer {} lagged, skipped {} frames", peer_id, skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    // Cleanup on disconnect
    state.leave(&room, &peer_id);
    info!("Peer {} left room {}", peer_id, room);
}
