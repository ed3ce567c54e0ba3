//! `WebSocket` handler for the live change stream.
//!
//! Clients connect to `GET /ws` and receive one text frame
//! `"<offset>,<color>"` per committed write. Each connection registers a
//! [`ChannelObserver`] with the hub and forwards whatever arrives on its
//! receiving half to the socket.
//!
//! A connection ends when the client closes it, the socket errors, the
//! hub drops the observer after a failed delivery (its buffer filled up),
//! or the server begins shutting down, in which case the client receives a
//! close frame with code 1001 (going away). In every case the observer is
//! unregistered on the way out.

use std::sync::Arc;

use axum::extract::ws::{CloseFrame, Message, Utf8Bytes, WebSocket, close_code};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use beli_events::ChannelObserver;
use beli_types::ObserverId;
use tracing::{debug, warn};

use crate::state::AppState;

/// Upgrade an HTTP request to a `WebSocket` connection and begin
/// streaming change frames.
///
/// # Route
///
/// `GET /ws`
pub async fn ws_changes(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_ws(socket, state))
}

/// Handle the `WebSocket` lifecycle: register with the hub and forward
/// each change frame as a text message.
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
    let (observer, mut frames) = match ChannelObserver::channel(state.observer_buffer) {
        Ok(pair) => pair,
        Err(e) => {
            warn!("Cannot create observer channel: {e}");
            return;
        }
    };
    let mut shutdown = state.shutdown_watch();
    if *shutdown.borrow_and_update() {
        close_going_away(&mut socket).await;
        return;
    }

    let id = ObserverId::new();
    state.hub.register(id, Arc::new(observer));
    debug!(%id, "WebSocket client connected");

    loop {
        tokio::select! {
            // Server is shutting down.
            _ = shutdown.changed() => {
                debug!(%id, "Closing WebSocket for shutdown");
                close_going_away(&mut socket).await;
                break;
            }
            // Forward a change frame from the hub.
            frame = frames.recv() => {
                let Some(frame) = frame else {
                    debug!(%id, "Observer dropped by hub, closing WebSocket");
                    break;
                };
                let msg = Message::Text(frame.to_string().into());
                if socket.send(msg).await.is_err() {
                    debug!(%id, "WebSocket client disconnected (send failed)");
                    break;
                }
            }
            // Check if the client sent a close frame or disconnected.
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => {
                        debug!(%id, "WebSocket client disconnected");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            debug!(%id, "WebSocket client disconnected (pong failed)");
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        debug!(%id, "WebSocket error: {e}");
                        break;
                    }
                    _ => {
                        // The stream is one-way; client text and binary
                        // frames are ignored.
                    }
                }
            }
        }
    }

    state.hub.unregister(id);
}

async fn close_going_away(socket: &mut WebSocket) {
    let frame = CloseFrame {
        code: close_code::AWAY,
        reason: Utf8Bytes::from_static("server shutting down"),
    };
    // The client may already be gone.
    let _ = socket.send(Message::Close(Some(frame))).await;
}
