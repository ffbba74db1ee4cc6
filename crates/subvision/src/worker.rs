// SPDX-FileCopyrightText: 2026 SubVision Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `subvision worker`: stage 1 wiring.

use std::path::Path;
use std::sync::Arc;

use subvision_config::SubvisionConfig;
use subvision_core::{PluginAdapter, QueueAdapter, SubvisionError};
use subvision_discord::DiscordNotifier;
use subvision_gemini::{GeminiClient, GeminiImageGenerator};
use subvision_pipeline::{
    FailureRouter, JobProcessor, JobQueueConsumer, PromptBuilder, ReadyEventPublisher,
};
use subvision_storage::{Database, SqliteDescriptionStore, SqliteQueue};
use tokio_util::sync::CancellationToken;
use tracing::info;

pub async fn run_worker(
    config: &SubvisionConfig,
    cancel: CancellationToken,
) -> Result<(), SubvisionError> {
    let db = Database::open(&config.storage.database_path).await?;
    let queue = Arc::new(SqliteQueue::new(db.clone()));
    let consumer = build_consumer(config, queue, db)?;

    consumer.run(cancel).await;
    info!("worker stopped");
    Ok(())
}

/// Assemble the job consumer over `queue`. Fails if the prompt data, the
/// Gemini key, or an enabled Discord section is unusable.
pub fn build_consumer(
    config: &SubvisionConfig,
    queue: Arc<dyn QueueAdapter + Send + Sync>,
    db: Database,
) -> Result<JobQueueConsumer, SubvisionError> {
    let prompts = Arc::new(PromptBuilder::from_file(Path::new(
        &config.worker.prompt_data_path,
    ))?);

    let client = GeminiClient::from_config(&config.gemini)?;
    let generator = Arc::new(GeminiImageGenerator::new(
        client,
        config.gemini.image_model.as_str(),
        config.gemini.output_dir.as_str(),
    ));

    let queues = &config.queues;
    let failures = FailureRouter::new(
        queue.clone(),
        queues.jobs.as_str(),
        queues.dead_letter.as_str(),
        queues.message_group_id.as_str(),
    );
    let ready = ReadyEventPublisher::new(
        queue.clone(),
        queues.ready.as_str(),
        queues.message_group_id.as_str(),
    );

    let mut processor = JobProcessor::new(
        queue.clone(),
        queues.jobs.as_str(),
        Arc::new(SqliteDescriptionStore::new(db)),
        generator,
        prompts,
        failures,
        ready,
    );
    if let Some(discord) =
        DiscordNotifier::from_config(&config.discord, config.gemini.output_dir.as_str())?
    {
        info!(notifier = discord.name(), "image notifications enabled");
        processor = processor.with_notifier(Arc::new(discord));
    }

    Ok(JobQueueConsumer::new(
        queue,
        Arc::new(processor),
        queues,
        &config.worker,
    ))
}
