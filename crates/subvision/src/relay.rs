// SPDX-FileCopyrightText: 2026 SubVision Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `subvision relay` and `subvision serve`: stage 2 wiring, and both
//! stages in one process.

use std::path::Path;
use std::sync::Arc;

use subvision_config::SubvisionConfig;
use subvision_core::{QueueAdapter, SubvisionError};
use subvision_gemini::{GeminiClient, GeminiValidator, SafetyPrompt};
use subvision_relay::{
    AckGate, Broadcaster, ConnectionRegistry, RelayConsumer, RelayState, broadcast, run_sweeper,
};
use subvision_storage::{Database, SqliteDescriptionStore, SqliteQueue};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::worker;

/// Everything stage 2 needs before it starts running.
pub struct RelayParts {
    pub state: RelayState,
    pub consumer: RelayConsumer,
    pub broadcaster: Broadcaster,
}

pub fn build_relay(
    config: &SubvisionConfig,
    queue: Arc<dyn QueueAdapter + Send + Sync>,
    db: Database,
    cancel: CancellationToken,
) -> Result<RelayParts, SubvisionError> {
    let relay = &config.relay;
    let registry = Arc::new(ConnectionRegistry::new());
    let gate = Arc::new(AckGate::new());
    let (handle, broadcaster) = broadcast::channel(registry.clone(), relay.broadcast_buffer);

    let consumer = RelayConsumer::new(queue, handle, gate.clone(), &config.queues, relay);

    let prompt = SafetyPrompt::from_file(Path::new(&config.gemini.safety_prompt_path))?;
    let validator = GeminiValidator::new(
        GeminiClient::from_config(&config.gemini)?,
        config.gemini.validation_model.as_str(),
        prompt,
    );

    let state = RelayState {
        registry,
        gate,
        descriptions: Arc::new(SqliteDescriptionStore::new(db)),
        validator: Arc::new(validator),
        client_buffer: relay.client_buffer,
        submission_cooldown: relay.submission_cooldown(),
        shutdown: cancel,
    };

    Ok(RelayParts {
        state,
        consumer,
        broadcaster,
    })
}

/// Run the relay until `cancel` fires or the HTTP server fails.
async fn drive_relay(
    config: &SubvisionConfig,
    parts: RelayParts,
    cancel: CancellationToken,
) -> Result<(), SubvisionError> {
    let RelayParts {
        state,
        consumer,
        broadcaster,
    } = parts;

    let sweeper = tokio::spawn(run_sweeper(
        state.registry.clone(),
        config.relay.sweep_interval(),
        config.relay.stale_after(),
        cancel.clone(),
    ));
    let fanout = tokio::spawn(broadcaster.run(cancel.clone()));

    let server = async {
        let result = subvision_relay::serve(&config.relay, state, cancel.clone()).await;
        if let Err(e) = &result {
            error!(error = %e, "relay server stopped");
        }
        // The consumer must not outlive the server its clients connect to.
        cancel.cancel();
        result
    };

    let (served, ()) = tokio::join!(server, consumer.run(cancel.clone()));

    let _ = sweeper.await;
    let _ = fanout.await;
    info!("relay stopped");
    served
}

pub async fn run_relay(
    config: &SubvisionConfig,
    cancel: CancellationToken,
) -> Result<(), SubvisionError> {
    let db = Database::open(&config.storage.database_path).await?;
    let queue = Arc::new(SqliteQueue::new(db.clone()));
    let parts = build_relay(config, queue, db, cancel.clone())?;
    drive_relay(config, parts, cancel).await
}

/// Both stages over one shared queue handle, so a ready event published by
/// the worker wakes the relay's long poll directly.
pub async fn run_serve(
    config: &SubvisionConfig,
    cancel: CancellationToken,
) -> Result<(), SubvisionError> {
    let db = Database::open(&config.storage.database_path).await?;
    let queue = Arc::new(SqliteQueue::new(db.clone()));

    let jobs = worker::build_consumer(config, queue.clone(), db.clone())?;
    let parts = build_relay(config, queue, db, cancel.clone())?;

    info!(
        jobs = config.queues.jobs.as_str(),
        ready = config.queues.ready.as_str(),
        "serving both stages"
    );
    let (relayed, ()) = tokio::join!(drive_relay(config, parts, cancel.clone()), async {
        jobs.run(cancel.clone()).await;
        info!("worker stopped");
    });
    relayed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_safety_prompt(dir: &Path) -> String {
        let path = dir.join("safety_prompt.json");
        std::fs::write(
            &path,
            r#"{"system_prompt":"s","user_prompt_template":"{description}","expected_responses":["yes","no"]}"#,
        )
        .unwrap();
        path.display().to_string()
    }

    #[tokio::test]
    async fn builds_relay_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = SubvisionConfig::default();
        config.gemini.safety_prompt_path = write_safety_prompt(dir.path());
        config.gemini.api_key = Some("key".into());
        config.relay.client_buffer = 7;

        let db = Database::open_in_memory().await.unwrap();
        let queue = Arc::new(SqliteQueue::new(db.clone()));
        let parts = build_relay(&config, queue, db, CancellationToken::new()).unwrap();
        assert_eq!(parts.state.client_buffer, 7);
        assert!(parts.state.registry.is_empty());
        assert!(!parts.state.gate.is_awaiting());
    }

    #[tokio::test]
    async fn relay_requires_safety_prompt() {
        let mut config = SubvisionConfig::default();
        config.gemini.safety_prompt_path = "/nonexistent/safety.json".into();
        config.gemini.api_key = Some("key".into());

        let db = Database::open_in_memory().await.unwrap();
        let queue = Arc::new(SqliteQueue::new(db.clone()));
        let err = build_relay(&config, queue, db, CancellationToken::new())
            .err()
            .unwrap();
        assert!(matches!(err, SubvisionError::Config(_)), "{err}");
    }

    #[tokio::test]
    async fn bind_failure_stops_the_consumer() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mut config = SubvisionConfig::default();
        config.gemini.safety_prompt_path = write_safety_prompt(dir.path());
        config.gemini.api_key = Some("key".into());
        config.relay.host = "127.0.0.1".into();
        config.relay.port = blocker.local_addr().unwrap().port();

        let db = Database::open_in_memory().await.unwrap();
        let queue = Arc::new(SqliteQueue::new(db.clone()));
        let cancel = CancellationToken::new();
        let parts = build_relay(&config, queue, db, cancel.clone()).unwrap();

        let result = tokio::time::timeout(
            std::time::Duration::from_secs(30),
            drive_relay(&config, parts, cancel.clone()),
        )
        .await
        .expect("relay should stop after bind failure");
        assert!(matches!(result, Err(SubvisionError::Transport { .. })));
        assert!(cancel.is_cancelled());
    }
}
