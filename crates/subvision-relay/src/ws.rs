// SPDX-FileCopyrightText: 2026 SubVision Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WebSocket endpoint for ready-event clients.
//!
//! Each connection gets a writer task draining its registry buffer and a
//! reader loop handling heartbeats and acknowledgments. The connection ends
//! on close, read error, eviction by the registry, or shutdown.

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::events::{ClientCommand, ClientEvent};
use crate::registry::Registration;
use crate::server::RelayState;

/// WebSocket upgrade handler.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<RelayState>) -> Response {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: RelayState) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let Registration {
        id,
        mut outbound,
        closed,
    } = state.registry.register(state.client_buffer);

    match ClientEvent::connection().to_json() {
        Ok(frame) => {
            state.registry.send_to(&id, frame);
        }
        Err(e) => warn!(client_id = %id, error = %e, "failed to encode welcome"),
    }

    let writer_closed = closed.clone();
    let writer = tokio::spawn(async move {
        loop {
            tokio::select! {
                frame = outbound.recv() => match frame {
                    Some(frame) => {
                        if ws_sender.send(Message::Text(frame.into())).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                },
                _ = writer_closed.cancelled() => break,
            }
        }
        let _ = ws_sender.send(Message::Close(None)).await;
    });

    loop {
        let msg = tokio::select! {
            msg = ws_receiver.next() => msg,
            _ = closed.cancelled() => break,
            _ = state.shutdown.cancelled() => break,
        };
        match msg {
            Some(Ok(Message::Text(text))) => handle_text(&state, &id, text.as_str()),
            Some(Ok(Message::Close(_))) | None => break,
            Some(Err(e)) => {
                debug!(client_id = %id, error = %e, "websocket read failed");
                break;
            }
            // Binary frames are ignored; protocol pings are answered by the transport.
            Some(Ok(_)) => {}
        }
    }

    state.registry.remove(&id);
    closed.cancel();
    let _ = writer.await;
}

fn handle_text(state: &RelayState, id: &Uuid, text: &str) {
    match ClientCommand::parse(text) {
        Some(ClientCommand::Ping) => {
            state.registry.heartbeat(id);
            match ClientEvent::pong().to_json() {
                Ok(frame) => {
                    state.registry.send_to(id, frame);
                }
                Err(e) => warn!(client_id = %id, error = %e, "failed to encode pong"),
            }
        }
        Some(ClientCommand::EventAcknowledged) => {
            state.registry.heartbeat(id);
            let outcome = state.gate.try_signal();
            debug!(client_id = %id, ?outcome, "acknowledgment received");
        }
        None => debug!(client_id = %id, "ignoring unrecognised client message"),
    }
}
