// SPDX-FileCopyrightText: 2026 SubVision Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end flow across both stages over the SQLite-backed queue.
//!
//! A job goes in at the jobs queue, an image comes out at a connected
//! client, and the ready message is only deleted once that client
//! acknowledges it.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use subvision_config::model::{QueuesConfig, RelayConfig};
use subvision_core::{DescriptionStore, QueueAdapter, SendRequest};
use subvision_pipeline::{
    FailureRouter, JobOutcome, JobProcessor, PromptBuilder, PromptData, ReadyEventPublisher,
};
use subvision_relay::{
    AckGate, ConnectionRegistry, PollOutcome, RelayConsumer, Resolution, SignalOutcome, broadcast,
};
use subvision_storage::{Database, SqliteDescriptionStore, SqliteQueue};
use subvision_test_utils::MockImageGenerator;
use tokio_util::sync::CancellationToken;

const IMAGE: &str = "img_ann_20240101_120000.png";

struct Pipeline {
    queue: Arc<SqliteQueue>,
    queues: QueuesConfig,
    descriptions: SqliteDescriptionStore,
    generator: MockImageGenerator,
    processor: JobProcessor,
    registry: Arc<ConnectionRegistry>,
    gate: Arc<AckGate>,
    relay: RelayConsumer,
    cancel: CancellationToken,
}

async fn pipeline() -> Pipeline {
    let db = Database::open_in_memory().await.unwrap();
    let queue = Arc::new(SqliteQueue::new(db.clone()));
    let shared: Arc<dyn QueueAdapter + Send + Sync> = queue.clone();
    let queues = QueuesConfig::default();
    let descriptions = SqliteDescriptionStore::new(db);
    let generator = MockImageGenerator::returning(IMAGE);

    let prompts = PromptBuilder::with_seed(
        PromptData {
            base_prompt: "{USER_DESCRIPTION} in {BACKGROUND}".into(),
            sign_texts: vec!["gg".into()],
            emotions: vec!["joyful".into()],
            backgrounds: vec!["a meadow".into()],
            actions: vec!["dancing".into()],
        },
        7,
    );
    let processor = JobProcessor::new(
        shared.clone(),
        queues.jobs.as_str(),
        Arc::new(descriptions.clone()),
        Arc::new(generator.clone()),
        Arc::new(prompts),
        FailureRouter::new(
            shared.clone(),
            queues.jobs.as_str(),
            queues.dead_letter.as_str(),
            queues.message_group_id.as_str(),
        ),
        ReadyEventPublisher::new(
            shared.clone(),
            queues.ready.as_str(),
            queues.message_group_id.as_str(),
        ),
    );

    let relay_config = RelayConfig {
        wait_secs: 1,
        ack_timeout_secs: 5,
        ..RelayConfig::default()
    };
    let registry = Arc::new(ConnectionRegistry::new());
    let gate = Arc::new(AckGate::new());
    let cancel = CancellationToken::new();
    let (handle, broadcaster) = broadcast::channel(registry.clone(), relay_config.broadcast_buffer);
    tokio::spawn(broadcaster.run(cancel.clone()));
    let relay = RelayConsumer::new(shared, handle, gate.clone(), &queues, &relay_config);

    Pipeline {
        queue,
        queues,
        descriptions,
        generator,
        processor,
        registry,
        gate,
        relay,
        cancel,
    }
}

async fn enqueue_job(p: &Pipeline, user_id: i64, username: &str) {
    let body = serde_json::json!({
        "user_id": user_id,
        "username": username,
        "datetime": "2024-01-01T12:00:00Z",
        "event": {"event_type": "sub", "user_tier": "1000", "months": 1, "n_bits": null}
    });
    p.queue
        .send(
            &p.queues.jobs,
            SendRequest::new(body.to_string()).with_group("0").with_dedup(format!("job-{username}")),
        )
        .await
        .unwrap();
}

async fn process_next_job(p: &Pipeline) -> JobOutcome {
    let options = subvision_core::ReceiveOptions {
        max_messages: 1,
        wait: Duration::from_secs(1),
        visibility_timeout: Duration::from_secs(60),
    };
    let messages = p.queue.receive(&p.queues.jobs, &options).await.unwrap();
    assert_eq!(messages.len(), 1, "expected one job");
    p.processor.process(&messages[0]).await
}

#[tokio::test]
async fn job_becomes_acknowledged_image_event() {
    let p = pipeline().await;
    p.descriptions.put("42", "a red fox").await.unwrap();
    enqueue_job(&p, 42, "ann").await;

    let outcome = process_next_job(&p).await;
    assert_eq!(outcome, JobOutcome::Completed {
        image_path: IMAGE.into(),
        ready_published: true,
    });
    let (prompt, username) = p.generator.calls().await.remove(0);
    assert_eq!(username, "ann");
    assert_eq!(prompt, "a red fox in a meadow");

    let jobs = p.queue.depth(&p.queues.jobs).await.unwrap();
    assert_eq!((jobs.available, jobs.in_flight), (0, 0));
    assert_eq!(p.queue.depth(&p.queues.ready).await.unwrap().available, 1);

    let mut client = p.registry.register(8);
    let gate = p.gate.clone();
    let acker = tokio::spawn(async move {
        let frame: Value = serde_json::from_str(&client.outbound.recv().await.unwrap()).unwrap();
        (frame, gate.try_signal())
    });

    let outcome = p.relay.poll_once(&p.cancel).await;
    assert_eq!(outcome, PollOutcome::Resolved(Resolution::Acknowledged));

    let (frame, signal) = acker.await.unwrap();
    assert_eq!(signal, SignalOutcome::Accepted);
    assert_eq!(frame["type"], "image_ready");
    assert_eq!(frame["data"]["username"], "ann");
    assert_eq!(frame["data"]["imagePath"], format!("/output_images/{IMAGE}"));

    let ready = p.queue.depth(&p.queues.ready).await.unwrap();
    assert_eq!((ready.available, ready.in_flight), (0, 0));
    p.cancel.cancel();
}

#[tokio::test]
async fn job_without_description_produces_nothing() {
    let p = pipeline().await;
    enqueue_job(&p, 7, "bob").await;

    assert_eq!(process_next_job(&p).await, JobOutcome::NoDescription);
    assert!(p.generator.calls().await.is_empty());

    for name in [&p.queues.jobs, &p.queues.dead_letter, &p.queues.ready] {
        let depth = p.queue.depth(name).await.unwrap();
        assert_eq!((depth.available, depth.in_flight), (0, 0), "{name}");
    }
    assert_eq!(p.relay.poll_once(&p.cancel).await, PollOutcome::Empty);
    p.cancel.cancel();
}

#[tokio::test]
async fn malformed_job_lands_in_dead_letter_queue() {
    let p = pipeline().await;
    p.queue
        .send(
            &p.queues.jobs,
            SendRequest::new("not json").with_group("0").with_dedup("bad"),
        )
        .await
        .unwrap();

    assert!(matches!(process_next_job(&p).await, JobOutcome::DeadLettered(_)));
    assert_eq!(p.queue.depth(&p.queues.dead_letter).await.unwrap().available, 1);
    assert_eq!(p.queue.depth(&p.queues.jobs).await.unwrap().available, 0);
    p.cancel.cancel();
}
