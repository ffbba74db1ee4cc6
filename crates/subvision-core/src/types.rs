// SPDX-FileCopyrightText: 2026 SubVision Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message schemas and common types shared by both pipeline stages.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Message attribute carrying the dead-letter failure reason.
pub const FAILURE_REASON_ATTRIBUTE: &str = "FailureReason";

/// Message attribute carrying the id of the message that was dead-lettered.
pub const ORIGINAL_MESSAGE_ID_ATTRIBUTE: &str = "OriginalMessageID";

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of external collaborator an adapter stands in for.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Queue,
    DescriptionStore,
    ImageGenerator,
    ContentValidator,
    Notifier,
}

// --- Queue wire types ---

/// A message handed out by a queue receive call.
///
/// The message stays owned by the queue until it is deleted with its
/// `receipt`. A redelivery of the same message carries a new receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueMessage {
    /// Queue-assigned message id, stable across redeliveries.
    pub message_id: String,
    /// Receipt handle for this delivery; required to delete the message.
    pub receipt: String,
    /// Raw message body.
    pub body: String,
    /// String attributes attached when the message was sent.
    pub attributes: HashMap<String, String>,
    /// How many times this message has been received, including this delivery.
    pub receive_count: u32,
}

/// Parameters for publishing a message to a queue.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendRequest {
    pub body: String,
    /// Message group; messages in one group are delivered strictly in order.
    pub group_id: Option<String>,
    /// Deduplication id; repeated ids within the dedup window are collapsed.
    pub dedup_id: Option<String>,
    pub attributes: HashMap<String, String>,
}

impl SendRequest {
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            ..Self::default()
        }
    }

    pub fn with_group(mut self, group_id: impl Into<String>) -> Self {
        self.group_id = Some(group_id.into());
        self
    }

    pub fn with_dedup(mut self, dedup_id: impl Into<String>) -> Self {
        self.dedup_id = Some(dedup_id.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

/// Parameters for a long-poll receive call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiveOptions {
    /// Upper bound on messages returned by one call.
    pub max_messages: u32,
    /// How long the call may block waiting for at least one message.
    pub wait: Duration,
    /// How long received messages stay hidden before becoming visible again.
    pub visibility_timeout: Duration,
}

// --- Stage 1 payloads ---

/// The structured body of a job message on the jobs queue.
///
/// Absent fields take their zero value, so any JSON object parses and a
/// missing `user_id` is caught by the user-id check rather than the parser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobPayload {
    #[serde(default)]
    pub user_id: i64,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub datetime: String,
    #[serde(default)]
    pub event: JobEvent,
}

/// The subscription event that triggered a job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobEvent {
    #[serde(default)]
    pub event_type: String,
    #[serde(default)]
    pub user_tier: String,
    #[serde(default)]
    pub months: i64,
    #[serde(default)]
    pub n_bits: Option<i64>,
}

/// Event published to the ready queue once an image exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadyEvent {
    pub username: String,
    /// Image filename relative to the output directory.
    pub image_path: String,
}

/// Why a job message was routed to the dead-letter queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
pub enum FailureReason {
    #[strum(serialize = "parse error")]
    ParseError,
    #[strum(serialize = "invalid user id")]
    InvalidUserId,
    #[strum(serialize = "description lookup failed")]
    DescriptionLookupFailed,
    #[strum(serialize = "generation failed")]
    GenerationFailed,
}

/// The payload of a single dead-letter publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureRecord {
    /// Original message body, verbatim.
    pub body: String,
    pub reason: FailureReason,
    pub original_message_id: String,
    /// Coarse second-granularity dedup id; distinct failures within one
    /// second share it.
    pub dedup_id: String,
}

impl FailureRecord {
    /// Build the dead-letter record for `message`, bucketing the dedup id by
    /// the given unix second.
    pub fn new(message: &QueueMessage, reason: FailureReason, unix_secs: i64) -> Self {
        Self {
            body: message.body.clone(),
            reason,
            original_message_id: message.message_id.clone(),
            dedup_id: unix_secs.to_string(),
        }
    }

    /// Convert into a queue publish request in the given message group.
    pub fn into_send_request(self, group_id: &str) -> SendRequest {
        SendRequest::new(self.body)
            .with_group(group_id)
            .with_dedup(self.dedup_id)
            .with_attribute(FAILURE_REASON_ATTRIBUTE, self.reason.to_string())
            .with_attribute(ORIGINAL_MESSAGE_ID_ATTRIBUTE, self.original_message_id)
    }
}

// --- Description store ---

/// A user's stored free-text description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDescription {
    pub user_id: String,
    pub description: String,
    /// RFC 3339 UTC timestamp of the last write.
    pub last_updated: String,
}
