//! WebSocket handler that streams session, queue and playback events.
//!
//! Clients receive a snapshot of live rooms on connect, then every
//! [`BroadcastEvent`](crate::events::BroadcastEvent) as a JSON text frame.
//! Incoming text frames are ignored except for `ping`.

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::sink::SinkExt;
use futures::stream::StreamExt;
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;

use crate::api::AppState;
use crate::services::SessionSummary;

/// Messages the server originates on its own, outside the event stream.
#[derive(Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
enum WsOutgoing {
    InitialState { rooms: Vec<SessionSummary> },
    Pong,
}

impl WsOutgoing {
    /// Serializes the message to a WebSocket text message.
    fn to_message(&self) -> Option<Message> {
        serde_json::to_string(self)
            .ok()
            .map(|s| Message::Text(s.into()))
    }
}

/// WebSocket upgrade handler.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, state))
}

async fn handle_ws(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let mut broadcast_rx = state.event_bridge.subscribe();

    log::info!("[WS] New connection established");

    let initial = WsOutgoing::InitialState {
        rooms: state.registry.list(),
    };
    if let Some(msg) = initial.to_message() {
        if sender.send(msg).await.is_err() {
            log::warn!("[WS] Failed to send initial state, client disconnected");
            return;
        }
    }

    let shutdown = state.shutdown.clone();
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                let _ = sender.send(Message::Close(None)).await;
                break;
            }
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) if text.as_str().trim() == "ping" => {
                        if let Some(msg) = WsOutgoing::Pong.to_message() {
                            let _ = sender.send(msg).await;
                        }
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    _ => {}
                }
            }
            event = broadcast_rx.recv() => {
                match event {
                    Ok(event) => {
                        if let Ok(json) = serde_json::to_string(&event) {
                            if sender.send(Message::Text(json.into())).await.is_err() {
                                break;
                            }
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        log::warn!("[WS] Client lagged, skipped {} event(s)", skipped);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
    }

    log::info!("[WS] Connection closed");
}
