//! WebSocket handler for realtime chat.
//!
//! `GET /ws` upgrades the connection. Each connection registers an
//! unbounded outbound channel with the [`ConnectionRegistry`] and then a
//! single task multiplexes with `tokio::select!`:
//!
//! - outbound: frames queued by the registry (acks, rejections, broadcasts)
//!   are written to the socket;
//! - inbound: text frames run through the intake pipeline, which replies
//!   through the registry rather than writing to the socket directly.
//!
//! On close or socket error the connection is removed from the registry.
//! Broadcasts racing with the removal fail the queued send and are swept by
//! the registry itself.

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};

use crate::state::AppState;

/// Upgrade an HTTP request to the chat WebSocket.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws_connection(socket, state))
}

/// Core WebSocket connection handler.
async fn handle_ws_connection(socket: WebSocket, state: AppState) {
    let (mut ws_sender, mut ws_receiver) = socket.split();

    let (outbound_tx, mut outbound_rx) = tokio::sync::mpsc::unbounded_channel::<String>();
    let connection_id = state.registry.register(outbound_tx);
    tracing::info!(%connection_id, "WebSocket connected");

    loop {
        tokio::select! {
            // --- Branch 1: Registry frames out to the client ---
            queued = outbound_rx.recv() => {
                match queued {
                    Some(json) => {
                        if ws_sender.send(Message::Text(json.into())).await.is_err() {
                            // Client disconnected
                            break;
                        }
                    }
                    // Sender side dropped, nothing left to deliver.
                    None => break,
                }
            }

            // --- Branch 2: Client frames into the intake pipeline ---
            inbound = ws_receiver.next() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => {
                        state.intake.handle_frame(&text, connection_id).await;
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        break;
                    }
                    Some(Err(err)) => {
                        tracing::debug!(%connection_id, "WebSocket receive error: {err}");
                        break;
                    }
                    // Ping/pong are answered by axum; binary frames are ignored.
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    state.registry.remove(connection_id);
    tracing::info!(%connection_id, "WebSocket disconnected");
}
