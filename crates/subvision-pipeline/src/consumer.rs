// SPDX-FileCopyrightText: 2026 SubVision Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Long-poll loop over the jobs queue.

use std::sync::Arc;
use std::time::Duration;

use subvision_config::model::{QueuesConfig, WorkerConfig};
use subvision_core::{QueueAdapter, ReceiveOptions};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::processor::JobProcessor;

/// Pulls batches from the jobs queue and hands each message to a
/// [`JobProcessor`], one at a time.
///
/// Receive errors are retried forever after a fixed backoff. Cancellation
/// is honoured at the top of each iteration and during every wait.
pub struct JobQueueConsumer {
    queue: Arc<dyn QueueAdapter + Send + Sync>,
    jobs_queue: String,
    processor: Arc<JobProcessor>,
    options: ReceiveOptions,
    error_backoff: Duration,
    poll_delay: Duration,
}

impl JobQueueConsumer {
    pub fn new(
        queue: Arc<dyn QueueAdapter + Send + Sync>,
        processor: Arc<JobProcessor>,
        queues: &QueuesConfig,
        worker: &WorkerConfig,
    ) -> Self {
        Self {
            queue,
            jobs_queue: queues.jobs.clone(),
            processor,
            options: ReceiveOptions {
                max_messages: worker.max_messages,
                wait: worker.wait(),
                visibility_timeout: worker.visibility_timeout(),
            },
            error_backoff: worker.error_backoff(),
            poll_delay: worker.poll_delay(),
        }
    }

    /// Run until `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken) {
        info!(queue = self.jobs_queue.as_str(), "job consumer started");

        while !cancel.is_cancelled() {
            let received = tokio::select! {
                result = self.queue.receive(&self.jobs_queue, &self.options) => result,
                _ = cancel.cancelled() => break,
            };

            match received {
                Ok(messages) => {
                    if !messages.is_empty() {
                        debug!(count = messages.len(), "job batch received");
                    }
                    for message in &messages {
                        // A started job runs to completion so its message is
                        // never left half-handled.
                        let outcome = self.processor.process(message).await;
                        debug!(message_id = message.message_id.as_str(), ?outcome, "job finished");
                    }
                }
                Err(e) => {
                    warn!(
                        queue = self.jobs_queue.as_str(),
                        error = %e,
                        backoff_secs = self.error_backoff.as_secs(),
                        "receive failed, backing off"
                    );
                    if !sleep_or_cancel(self.error_backoff, &cancel).await {
                        break;
                    }
                    continue;
                }
            }

            if !sleep_or_cancel(self.poll_delay, &cancel).await {
                break;
            }
        }

        info!(queue = self.jobs_queue.as_str(), "job consumer stopped");
    }
}

/// Sleep for `duration`; returns `false` if cancelled first.
async fn sleep_or_cancel(duration: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(duration) => true,
        _ = cancel.cancelled() => false,
    }
}
