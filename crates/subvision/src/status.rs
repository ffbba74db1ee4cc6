// SPDX-FileCopyrightText: 2026 SubVision Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `subvision status`: queue depths.

use subvision_config::SubvisionConfig;
use subvision_core::SubvisionError;
use subvision_storage::{Database, SqliteQueue};

pub async fn run_status(config: &SubvisionConfig) -> Result<(), SubvisionError> {
    let db = Database::open(&config.storage.database_path).await?;
    let queue = SqliteQueue::new(db);

    for name in [
        &config.queues.jobs,
        &config.queues.dead_letter,
        &config.queues.ready,
    ] {
        let depth = queue.depth(name).await?;
        println!(
            "{name}: available={} in_flight={}",
            depth.available, depth.in_flight
        );
    }
    Ok(())
}
