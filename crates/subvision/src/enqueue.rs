// SPDX-FileCopyrightText: 2026 SubVision Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `subvision enqueue`: publish one job message, standing in for the
//! upstream events tracker.

use clap::Args;
use subvision_config::SubvisionConfig;
use subvision_core::{JobEvent, JobPayload, QueueAdapter, SendRequest, SubvisionError};
use subvision_storage::{Database, SqliteQueue};
use tracing::info;

#[derive(Args, Debug)]
pub struct EnqueueArgs {
    #[arg(long)]
    pub user_id: i64,
    #[arg(long)]
    pub username: String,
    /// Event kind, e.g. `sub`, `resub`, `subgift`, `bits`.
    #[arg(long)]
    pub event_type: String,
    #[arg(long, default_value = "1000")]
    pub user_tier: String,
    #[arg(long, default_value_t = 1)]
    pub months: i64,
    #[arg(long)]
    pub n_bits: Option<i64>,
}

impl EnqueueArgs {
    fn into_payload(self) -> JobPayload {
        JobPayload {
            user_id: self.user_id,
            username: self.username,
            datetime: chrono::Utc::now().to_rfc3339(),
            event: JobEvent {
                event_type: self.event_type,
                user_tier: self.user_tier,
                months: self.months,
                n_bits: self.n_bits,
            },
        }
    }
}

pub async fn run_enqueue(config: &SubvisionConfig, args: EnqueueArgs) -> Result<(), SubvisionError> {
    let db = Database::open(&config.storage.database_path).await?;
    let queue = SqliteQueue::new(db);

    let job = args.into_payload();
    let dedup_id = format!(
        "{}{}{}{}",
        chrono::Utc::now().timestamp(),
        job.username,
        job.event.event_type,
        uuid::Uuid::new_v4().simple()
    );
    let request = SendRequest::new(serde_json::to_string(&job)?)
        .with_group(config.queues.message_group_id.as_str())
        .with_dedup(dedup_id);

    let message_id = queue.send(&config.queues.jobs, request).await?;
    info!(
        queue = config.queues.jobs.as_str(),
        message_id = message_id.as_str(),
        "job enqueued"
    );
    println!("{message_id}");
    Ok(())
}
