// SPDX-License-Identifier: MIT

//! Realtime WebSocket Gateway (C6, spec.md §4.6): fans out domain events to
//! subscribed clients over `/ws/events`. The per-connection upgrade handler
//! is grounded on `iridite-tandem`'s `pty_ws`/`pty_ws_stream` split (an
//! `axum::extract::ws::WebSocketUpgrade` handler that hands the live
//! `WebSocket` to a dedicated stream task); the registry it streams from is
//! [`hub::Hub`].

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod hub;

pub use hub::{ClientId, Hub};

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures_util::{SinkExt, StreamExt};
use sf_wire::ClientMessage;
use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Server-initiated ping cadence (spec.md §4.6).
const PING_INTERVAL: Duration = Duration::from_secs(54);
/// How long the server waits for a pong (or any client frame) before
/// treating the connection as dead.
const PONG_DEADLINE: Duration = Duration::from_secs(60);

/// Builds the `/ws/events` route. Nested into `sf-api`'s router under the
/// shared `Hub` state.
pub fn router(hub: Hub) -> Router {
    Router::new().route("/ws/events", get(upgrade)).with_state(hub)
}

async fn upgrade(ws: WebSocketUpgrade, State(hub): State<Hub>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| stream(socket, hub))
}

async fn stream(socket: WebSocket, hub: Hub) {
    let client_id: ClientId = Uuid::new_v4();
    let (tx, mut rx) = mpsc::channel::<String>(hub::CLIENT_BUFFER);
    hub.register(client_id, tx);

    let (mut sink, mut source) = socket.split();
    let mut ping_timer = tokio::time::interval(PING_INTERVAL);
    ping_timer.tick().await; // first tick fires immediately; consume it

    let mut last_seen = tokio::time::Instant::now();

    loop {
        tokio::select! {
            outgoing = rx.recv() => {
                let Some(payload) = outgoing else { break };
                if sink.send(Message::Text(payload.into())).await.is_err() {
                    break;
                }
            }
            incoming = source.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        last_seen = tokio::time::Instant::now();
                        handle_client_message(&hub, client_id, &text);
                    }
                    Some(Ok(Message::Pong(_))) => {
                        last_seen = tokio::time::Instant::now();
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        tracing::debug!(client_id = %client_id, error = %err, "websocket read error");
                        break;
                    }
                }
            }
            _ = ping_timer.tick() => {
                if last_seen.elapsed() > PONG_DEADLINE {
                    tracing::debug!(client_id = %client_id, "client missed pong deadline, disconnecting");
                    break;
                }
                if sink.send(Message::Ping(Vec::new().into())).await.is_err() {
                    break;
                }
            }
        }
    }

    hub.unregister(client_id);
}

fn handle_client_message(hub: &Hub, client_id: ClientId, text: &str) {
    let Ok(message) = serde_json::from_str::<ClientMessage>(text) else {
        tracing::debug!(client_id = %client_id, "ignoring malformed WS client message");
        return;
    };
    match message {
        ClientMessage::Subscribe { event_types } => hub.add_filter(client_id, &event_types),
        ClientMessage::Unsubscribe { event_types } => hub.remove_filter(client_id, &event_types),
    }
}

#[cfg(test)]
mod tests;
