// SPDX-FileCopyrightText: 2026 SubVision Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementations of the queue and description-store traits.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::debug;

use subvision_core::{
    AdapterType, DescriptionStore, HealthStatus, PluginAdapter, QueueAdapter, QueueMessage,
    ReceiveOptions, SendRequest, SubvisionError, UserDescription,
};

use crate::database::Database;
use crate::queries;

/// How often a waiting receive re-checks the table when no in-process send
/// wakes it. Covers producers running in another process.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// SQLite-backed queue with long-poll receive.
///
/// Sends made through this handle (or its clones) wake waiting receivers
/// immediately.
#[derive(Clone)]
pub struct SqliteQueue {
    db: Database,
    notify: Arc<Notify>,
}

impl SqliteQueue {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            notify: Arc::new(Notify::new()),
        }
    }

    /// Count available and in-flight messages.
    pub async fn depth(&self, queue: &str) -> Result<queries::queue::QueueDepth, SubvisionError> {
        queries::queue::depth(&self.db, queue).await
    }
}

#[async_trait]
impl PluginAdapter for SqliteQueue {
    fn name(&self) -> &str {
        "sqlite-queue"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Queue
    }

    async fn health_check(&self) -> Result<HealthStatus, SubvisionError> {
        Ok(match self.db.ping().await {
            Ok(()) => HealthStatus::Healthy,
            Err(e) => HealthStatus::Unhealthy(e.to_string()),
        })
    }
}

#[async_trait]
impl QueueAdapter for SqliteQueue {
    async fn receive(
        &self,
        queue: &str,
        options: &ReceiveOptions,
    ) -> Result<Vec<QueueMessage>, SubvisionError> {
        let deadline = Instant::now() + options.wait;
        loop {
            // Register interest before checking so a send in between is not missed.
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let messages = queries::queue::claim(
                &self.db,
                queue,
                options.max_messages,
                options.visibility_timeout,
            )
            .await?;
            if !messages.is_empty() {
                debug!(queue, count = messages.len(), "messages received");
                return Ok(messages);
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(Vec::new());
            }
            let nap = (deadline - now).min(POLL_INTERVAL);
            tokio::select! {
                _ = &mut notified => {}
                _ = tokio::time::sleep(nap) => {}
            }
        }
    }

    async fn send(&self, queue: &str, request: SendRequest) -> Result<String, SubvisionError> {
        let outcome = queries::queue::send(&self.db, queue, request).await?;
        if outcome.deduplicated {
            debug!(queue, message_id = %outcome.message_id, "send deduplicated");
        } else {
            self.notify.notify_waiters();
        }
        Ok(outcome.message_id)
    }

    async fn delete(&self, queue: &str, receipt: &str) -> Result<bool, SubvisionError> {
        queries::queue::delete(&self.db, queue, receipt).await
    }
}

/// SQLite-backed user-description store.
#[derive(Clone)]
pub struct SqliteDescriptionStore {
    db: Database,
}

impl SqliteDescriptionStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PluginAdapter for SqliteDescriptionStore {
    fn name(&self) -> &str {
        "sqlite-descriptions"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::DescriptionStore
    }
}

#[async_trait]
impl DescriptionStore for SqliteDescriptionStore {
    async fn get(&self, user_id: &str) -> Result<Option<UserDescription>, SubvisionError> {
        queries::descriptions::get(&self.db, user_id).await
    }

    async fn put(&self, user_id: &str, description: &str) -> Result<(), SubvisionError> {
        queries::descriptions::put(&self.db, user_id, description).await
    }
}
