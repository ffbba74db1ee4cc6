// SPDX-FileCopyrightText: 2026 SubVision Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-message job handling.
//!
//! Every message ends in exactly one of three terminal paths: routed to the
//! dead-letter queue (which deletes it), deleted directly because the user
//! has no description, or deleted after the ready-event publish attempt.

use std::sync::Arc;

use subvision_core::{
    DescriptionStore, FailureReason, ImageGenerator, JobPayload, Notifier, QueueAdapter,
    QueueMessage,
};
use tracing::{debug, error, info, warn};

use crate::failure::FailureRouter;
use crate::prompt::PromptBuilder;
use crate::ready::ReadyEventPublisher;

/// Terminal state reached for one job message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// Sent to the dead-letter path.
    DeadLettered(FailureReason),
    /// The user has no description yet; deleted without side effects.
    NoDescription,
    /// An image was generated. `ready_published` is false when the ready
    /// event could not be sent; the job still counts as done.
    Completed {
        image_path: String,
        ready_published: bool,
    },
}

pub struct JobProcessor {
    queue: Arc<dyn QueueAdapter + Send + Sync>,
    source_queue: String,
    descriptions: Arc<dyn DescriptionStore + Send + Sync>,
    generator: Arc<dyn ImageGenerator + Send + Sync>,
    prompts: Arc<PromptBuilder>,
    failures: FailureRouter,
    ready: ReadyEventPublisher,
    notifier: Option<Arc<dyn Notifier + Send + Sync>>,
}

impl JobProcessor {
    pub fn new(
        queue: Arc<dyn QueueAdapter + Send + Sync>,
        source_queue: impl Into<String>,
        descriptions: Arc<dyn DescriptionStore + Send + Sync>,
        generator: Arc<dyn ImageGenerator + Send + Sync>,
        prompts: Arc<PromptBuilder>,
        failures: FailureRouter,
        ready: ReadyEventPublisher,
    ) -> Self {
        Self {
            queue,
            source_queue: source_queue.into(),
            descriptions,
            generator,
            prompts,
            failures,
            ready,
            notifier: None,
        }
    }

    /// Announce finished images through `notifier`, off the processing path.
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier + Send + Sync>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub async fn process(&self, message: &QueueMessage) -> JobOutcome {
        let message_id = message.message_id.as_str();
        debug!(message_id, receive_count = message.receive_count, "processing job message");

        let job: JobPayload = match serde_json::from_str(&message.body) {
            Ok(job) => job,
            Err(e) => {
                warn!(message_id, error = %e, "job body did not parse");
                return self.dead_letter(message, FailureReason::ParseError).await;
            }
        };

        if job.user_id <= 0 {
            warn!(message_id, user_id = job.user_id, "job has no valid user id");
            return self.dead_letter(message, FailureReason::InvalidUserId).await;
        }

        let description = match self.descriptions.get(&job.user_id.to_string()).await {
            Ok(found) => found.map(|d| d.description).unwrap_or_default(),
            Err(e) => {
                error!(message_id, user_id = job.user_id, error = %e, "description lookup failed");
                return self
                    .dead_letter(message, FailureReason::DescriptionLookupFailed)
                    .await;
            }
        };

        if description.trim().is_empty() {
            info!(message_id, user_id = job.user_id, "no description for user, dropping job");
            self.delete_source(message).await;
            return JobOutcome::NoDescription;
        }

        let prompt = self.prompts.build(&description);
        let image_path = match self.generator.generate(&prompt, &job.username).await {
            Ok(path) => path,
            Err(e) => {
                error!(message_id, username = job.username.as_str(), error = %e, "image generation failed");
                return self.dead_letter(message, FailureReason::GenerationFailed).await;
            }
        };
        info!(message_id, image_path = image_path.as_str(), "image generated");

        let ready_published = match self.ready.publish(&job, &image_path).await {
            Ok(_) => true,
            Err(e) => {
                warn!(message_id, error = %e, "ready event publish failed; image kept");
                false
            }
        };

        self.delete_source(message).await;
        self.spawn_notification(&job.username, &image_path);

        JobOutcome::Completed {
            image_path,
            ready_published,
        }
    }

    async fn dead_letter(&self, message: &QueueMessage, reason: FailureReason) -> JobOutcome {
        self.failures.route(message, reason).await;
        JobOutcome::DeadLettered(reason)
    }

    async fn delete_source(&self, message: &QueueMessage) {
        match self.queue.delete(&self.source_queue, &message.receipt).await {
            Ok(true) => {}
            Ok(false) => warn!(
                message_id = message.message_id.as_str(),
                "receipt expired before delete; message will be redelivered"
            ),
            Err(e) => error!(
                message_id = message.message_id.as_str(),
                error = %e,
                "failed to delete job message"
            ),
        }
    }

    fn spawn_notification(&self, username: &str, image_path: &str) {
        let Some(notifier) = self.notifier.clone() else {
            return;
        };
        let username = username.to_string();
        let image_path = image_path.to_string();
        tokio::spawn(async move {
            if let Err(e) = notifier.notify(&username, &image_path).await {
                warn!(username = username.as_str(), error = %e, "notification failed");
            }
        });
    }
}
