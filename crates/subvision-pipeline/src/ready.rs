// SPDX-FileCopyrightText: 2026 SubVision Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Publishes ready events once an image exists.

use std::sync::Arc;

use subvision_core::{JobPayload, QueueAdapter, ReadyEvent, SendRequest, SubvisionError};
use tracing::info;

use crate::failure::{Clock, system_clock};

pub struct ReadyEventPublisher {
    queue: Arc<dyn QueueAdapter + Send + Sync>,
    ready_queue: String,
    group_id: String,
    clock: Clock,
}

impl ReadyEventPublisher {
    pub fn new(
        queue: Arc<dyn QueueAdapter + Send + Sync>,
        ready_queue: impl Into<String>,
        group_id: impl Into<String>,
    ) -> Self {
        Self {
            queue,
            ready_queue: ready_queue.into(),
            group_id: group_id.into(),
            clock: system_clock,
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Dedup id for a ready event: `{user_id}_{event_type}_{unix_secs}`.
    pub fn dedup_id(job: &JobPayload, unix_secs: i64) -> String {
        format!("{}_{}_{}", job.user_id, job.event.event_type, unix_secs)
    }

    /// Publish `{username, image_path}` for `job`. Returns the message id.
    pub async fn publish(&self, job: &JobPayload, image_path: &str) -> Result<String, SubvisionError> {
        let event = ReadyEvent {
            username: job.username.clone(),
            image_path: image_path.to_string(),
        };
        let request = SendRequest::new(serde_json::to_string(&event)?)
            .with_group(self.group_id.as_str())
            .with_dedup(Self::dedup_id(job, (self.clock)()));

        let message_id = self.queue.send(&self.ready_queue, request).await?;
        info!(
            user_id = job.user_id,
            username = job.username.as_str(),
            image_path,
            "ready event published"
        );
        Ok(message_id)
    }
}

#[cfg(test)]
mod tests {
    use subvision_core::JobEvent;
    use subvision_test_utils::MockQueue;

    use super::*;

    fn job() -> JobPayload {
        JobPayload {
            user_id: 42,
            username: "ann".into(),
            datetime: String::new(),
            event: JobEvent {
                event_type: "sub".into(),
                user_tier: "1000".into(),
                months: 1,
                n_bits: None,
            },
        }
    }

    #[tokio::test]
    async fn publishes_event_with_identity_dedup() {
        let queue = MockQueue::new();
        let publisher = ReadyEventPublisher::new(Arc::new(queue.clone()), "ready.fifo", "0")
            .with_clock(|| 1_704_110_400);

        publisher
            .publish(&job(), "img_ann_20240101_120000.png")
            .await
            .unwrap();

        let sent = queue.sent("ready.fifo").await;
        assert_eq!(sent.len(), 1);
        assert_eq!(
            sent[0].body,
            r#"{"username":"ann","image_path":"img_ann_20240101_120000.png"}"#
        );
        assert_eq!(sent[0].dedup_id.as_deref(), Some("42_sub_1704110400"));
        assert_eq!(sent[0].group_id.as_deref(), Some("0"));
    }

    #[tokio::test]
    async fn retried_publish_in_same_second_is_collapsed() {
        let queue = MockQueue::new();
        let publisher = ReadyEventPublisher::new(Arc::new(queue.clone()), "ready.fifo", "0")
            .with_clock(|| 1_704_110_400);

        let a = publisher.publish(&job(), "img_a.png").await.unwrap();
        let b = publisher.publish(&job(), "img_a.png").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(queue.sent("ready.fifo").await.len(), 1);
    }

    #[tokio::test]
    async fn send_failure_is_returned() {
        let queue = MockQueue::new();
        queue.fail_sends_to("ready.fifo").await;
        let publisher = ReadyEventPublisher::new(Arc::new(queue), "ready.fifo", "0");
        assert!(publisher.publish(&job(), "img.png").await.is_err());
    }
}
