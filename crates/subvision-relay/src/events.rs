// SPDX-FileCopyrightText: 2026 SubVision Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire messages exchanged with real-time clients.
//!
//! Server -> client (JSON):
//! ```json
//! {"type": "connection", "data": "Connected to ready-event relay", "timestamp": "..."}
//! {"type": "pong", "data": "heartbeat response", "timestamp": "..."}
//! {"type": "image_ready", "data": {"username": "...", "imagePath": "...", "messageId": "...", "receipt": "..."}, "timestamp": "..."}
//! {"type": "sqs_message", "data": {"messageId": "...", "body": "...", "receipt": "..."}, "timestamp": "..."}
//! ```
//!
//! Client -> server (JSON): `{"type": "ping"}` and `{"type": "event_acknowledged"}`.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use subvision_core::{QueueMessage, ReadyEvent};

/// Server -> client message type constants.
pub mod message_types {
    pub const CONNECTION: &str = "connection";
    pub const PONG: &str = "pong";
    pub const IMAGE_READY: &str = "image_ready";
    pub const SQS_MESSAGE: &str = "sqs_message";
}

/// Envelope for every server -> client message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: Value,
    /// RFC 3339 send time.
    pub timestamp: String,
}

impl ClientEvent {
    fn now(event_type: &str, data: Value) -> Self {
        Self {
            event_type: event_type.to_string(),
            data,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Greeting sent once a client connects.
    pub fn connection() -> Self {
        Self::now(
            message_types::CONNECTION,
            Value::String("Connected to ready-event relay".into()),
        )
    }

    /// Reply to a client heartbeat.
    pub fn pong() -> Self {
        Self::now(message_types::PONG, Value::String("heartbeat response".into()))
    }

    /// A parsed ready event. `image_path_prefix` is prepended verbatim to
    /// the image filename so browsers can load it from the static mount.
    pub fn image_ready(event: &ReadyEvent, image_path_prefix: &str, message: &QueueMessage) -> Self {
        Self::now(
            message_types::IMAGE_READY,
            json!({
                "username": event.username,
                "imagePath": format!("{image_path_prefix}{}", event.image_path),
                "messageId": message.message_id,
                "receipt": message.receipt,
            }),
        )
    }

    /// Fallback for a ready-queue body that did not parse; carries the raw
    /// body so it is still observable.
    pub fn sqs_message(message: &QueueMessage) -> Self {
        Self::now(
            message_types::SQS_MESSAGE,
            json!({
                "messageId": message.message_id,
                "body": message.body,
                "receipt": message.receipt,
            }),
        )
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Message received from a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCommand {
    Ping,
    EventAcknowledged,
}

#[derive(Deserialize)]
struct IncomingEnvelope {
    #[serde(rename = "type")]
    kind: String,
}

impl ClientCommand {
    /// Parse a client text frame. Unknown types and non-JSON yield `None`.
    pub fn parse(text: &str) -> Option<Self> {
        let envelope: IncomingEnvelope = serde_json::from_str(text).ok()?;
        match envelope.kind.as_str() {
            "ping" => Some(Self::Ping),
            "event_acknowledged" => Some(Self::EventAcknowledged),
            _ => None,
        }
    }
}
