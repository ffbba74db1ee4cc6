// SPDX-FileCopyrightText: 2026 SubVision Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Queue adapter trait for at-least-once message queues.

use async_trait::async_trait;

use crate::error::SubvisionError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{QueueMessage, ReceiveOptions, SendRequest};

/// Adapter for a durable, at-least-once queue with visibility timeouts.
///
/// A received message is hidden for the visibility timeout and reappears
/// unless it is deleted with the receipt from that delivery. Messages sent
/// with a group id are delivered in order within the group; messages sent
/// with a dedup id already seen within the dedup window are dropped.
#[async_trait]
pub trait QueueAdapter: PluginAdapter {
    /// Long-poll `queue` for up to `options.max_messages` messages.
    ///
    /// Returns an empty vector when nothing arrived within `options.wait`.
    async fn receive(
        &self,
        queue: &str,
        options: &ReceiveOptions,
    ) -> Result<Vec<QueueMessage>, SubvisionError>;

    /// Publish a message and return its message id.
    ///
    /// A deduplicated send returns the id of the message it collapsed into.
    async fn send(&self, queue: &str, request: SendRequest) -> Result<String, SubvisionError>;

    /// Delete the message delivered under `receipt`.
    ///
    /// Returns `false` when the receipt no longer refers to a live delivery.
    async fn delete(&self, queue: &str, receipt: &str) -> Result<bool, SubvisionError>;
}
