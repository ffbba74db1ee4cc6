// SPDX-FileCopyrightText: 2026 SubVision Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dead-letter routing for job messages that cannot be processed.

use std::sync::Arc;

use subvision_core::{FailureReason, FailureRecord, QueueAdapter, QueueMessage};
use tracing::{error, warn};

/// Unix-seconds clock; swapped out in tests.
pub type Clock = fn() -> i64;

pub(crate) fn system_clock() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Publishes failed messages to the dead-letter queue and removes them from
/// the source queue.
///
/// The dedup id is the current unix second, so two unrelated failures in the
/// same second collapse into one dead-letter entry.
pub struct FailureRouter {
    queue: Arc<dyn QueueAdapter + Send + Sync>,
    source_queue: String,
    dead_letter_queue: String,
    group_id: String,
    clock: Clock,
}

/// What happened while routing one failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutingOutcome {
    pub dead_lettered: bool,
    pub deleted: bool,
}

impl FailureRouter {
    pub fn new(
        queue: Arc<dyn QueueAdapter + Send + Sync>,
        source_queue: impl Into<String>,
        dead_letter_queue: impl Into<String>,
        group_id: impl Into<String>,
    ) -> Self {
        Self {
            queue,
            source_queue: source_queue.into(),
            dead_letter_queue: dead_letter_queue.into(),
            group_id: group_id.into(),
            clock: system_clock,
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Dead-letter `message` with `reason`, then delete it from the source
    /// queue whether or not the dead-letter publish succeeded.
    pub async fn route(&self, message: &QueueMessage, reason: FailureReason) -> RoutingOutcome {
        let record = FailureRecord::new(message, reason, (self.clock)());
        let dedup_id = record.dedup_id.clone();

        let dead_lettered = match self
            .queue
            .send(&self.dead_letter_queue, record.into_send_request(&self.group_id))
            .await
        {
            Ok(_) => {
                warn!(
                    message_id = message.message_id.as_str(),
                    reason = %reason,
                    dedup_id = dedup_id.as_str(),
                    "message moved to dead-letter queue"
                );
                true
            }
            Err(e) => {
                error!(
                    message_id = message.message_id.as_str(),
                    reason = %reason,
                    error = %e,
                    "dead-letter publish failed"
                );
                false
            }
        };

        let deleted = match self.queue.delete(&self.source_queue, &message.receipt).await {
            Ok(deleted) => {
                if !deleted {
                    warn!(
                        message_id = message.message_id.as_str(),
                        "receipt expired before delete; message will be redelivered"
                    );
                }
                deleted
            }
            Err(e) => {
                error!(
                    message_id = message.message_id.as_str(),
                    error = %e,
                    "failed to delete dead-lettered message"
                );
                false
            }
        };

        RoutingOutcome {
            dead_lettered,
            deleted,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use subvision_core::types::{FAILURE_REASON_ATTRIBUTE, ORIGINAL_MESSAGE_ID_ATTRIBUTE};
    use subvision_core::ReceiveOptions;
    use subvision_test_utils::MockQueue;

    use super::*;

    const JOBS: &str = "jobs.fifo";
    const DLQ: &str = "dlq.fifo";

    fn fixed_clock() -> i64 {
        1_700_000_000
    }

    async fn received(queue: &MockQueue, body: &str) -> QueueMessage {
        queue.push(JOBS, body).await;
        queue
            .receive(
                JOBS,
                &ReceiveOptions {
                    max_messages: 1,
                    wait: Duration::ZERO,
                    visibility_timeout: Duration::from_secs(60),
                },
            )
            .await
            .unwrap()
            .remove(0)
    }

    fn router(queue: &MockQueue) -> FailureRouter {
        FailureRouter::new(Arc::new(queue.clone()), JOBS, DLQ, "0").with_clock(fixed_clock)
    }

    #[tokio::test]
    async fn routes_body_verbatim_with_attributes() {
        let queue = MockQueue::new();
        let message = received(&queue, "not json").await;

        let outcome = router(&queue).route(&message, FailureReason::ParseError).await;
        assert_eq!(
            outcome,
            RoutingOutcome {
                dead_lettered: true,
                deleted: true
            }
        );

        let sent = queue.sent(DLQ).await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].body, "not json");
        assert_eq!(sent[0].group_id.as_deref(), Some("0"));
        assert_eq!(sent[0].dedup_id.as_deref(), Some("1700000000"));
        assert_eq!(sent[0].attributes[FAILURE_REASON_ATTRIBUTE], "parse error");
        assert_eq!(sent[0].attributes[ORIGINAL_MESSAGE_ID_ATTRIBUTE], message.message_id);
        assert_eq!(queue.deleted(JOBS).await, vec![message.receipt]);
    }

    #[tokio::test]
    async fn deletes_even_when_publish_fails() {
        let queue = MockQueue::new();
        let message = received(&queue, "{}").await;
        queue.fail_sends_to(DLQ).await;

        let outcome = router(&queue).route(&message, FailureReason::InvalidUserId).await;
        assert!(!outcome.dead_lettered);
        assert!(outcome.deleted);
        assert_eq!(queue.in_flight(JOBS).await, 0);
    }

    #[tokio::test]
    async fn same_second_failures_collide_on_dedup_id() {
        let queue = MockQueue::new();
        let first = received(&queue, "first").await;
        let second = received(&queue, "second").await;
        let router = router(&queue);

        router.route(&first, FailureReason::ParseError).await;
        router.route(&second, FailureReason::GenerationFailed).await;

        // The second dead-letter publish is swallowed by dedup, yet both
        // originals leave the source queue.
        let sent = queue.sent(DLQ).await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].body, "first");
        assert_eq!(queue.deleted(JOBS).await.len(), 2);
    }
}
