// SPDX-FileCopyrightText: 2026 SubVision Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Relay HTTP surface: health, description submission, and a live WebSocket.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use subvision_config::model::RelayConfig;
use subvision_core::DescriptionStore;
use subvision_relay::handlers::{MSG_REJECTED, MSG_SAVE_FAILED, MSG_SAVED, SubmitDescriptionResponse};
use subvision_relay::{AckGate, ConnectionRegistry, RelayState, router, serve_on};
use subvision_test_utils::{MockDescriptionStore, MockValidator};
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

struct Fixture {
    state: RelayState,
    store: MockDescriptionStore,
    validator: MockValidator,
}

fn fixture(validator: MockValidator) -> Fixture {
    let store = MockDescriptionStore::new();
    let state = RelayState {
        registry: Arc::new(ConnectionRegistry::new()),
        gate: Arc::new(AckGate::new()),
        descriptions: Arc::new(store.clone()),
        validator: Arc::new(validator.clone()),
        client_buffer: 16,
        submission_cooldown: Duration::from_secs(10),
        shutdown: CancellationToken::new(),
    };
    Fixture {
        state,
        store,
        validator,
    }
}

async fn call(state: &RelayState, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = router(&RelayConfig::default(), state.clone())
        .oneshot(request)
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body.to_vec())
}

fn submit(user_id: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::post("/api/submit-description").header("content-type", "application/json");
    if let Some(user_id) = user_id {
        builder = builder.header("x-user-id", user_id);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn submit_json(state: &RelayState, body: &str) -> SubmitDescriptionResponse {
    let (status, bytes) = call(state, submit(Some("42"), body)).await;
    assert_eq!(status, StatusCode::OK);
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_reports_clients_and_gate() {
    let f = fixture(MockValidator::accepting());
    let _client = f.state.registry.register(4);
    f.state.gate.begin().await;

    let (status, bytes) = call(&f.state, Request::get("/health").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["clients"], 1);
    assert_eq!(body["awaiting_ack"], true);
}

#[tokio::test]
async fn accepted_description_is_saved() {
    let f = fixture(MockValidator::accepting());
    let response = submit_json(&f.state, r#"{"description": "  a red fox  "}"#).await;
    assert_eq!(response, SubmitDescriptionResponse {
        success: true,
        message: MSG_SAVED.into(),
        valid: true,
    });
    assert_eq!(f.validator.calls().await, vec!["a red fox".to_string()]);

    let (status, bytes) = call(
        &f.state,
        Request::get("/api/user-data")
            .header("x-user-id", "42")
            .header("x-username", "ann")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["userId"], "42");
    assert_eq!(body["username"], "ann");
    assert_eq!(body["description"], "a red fox");
}

#[tokio::test]
async fn rejected_description_is_not_saved() {
    let f = fixture(MockValidator::rejecting());
    let response = submit_json(&f.state, r#"{"description": "something rude"}"#).await;
    assert_eq!(response.message, MSG_REJECTED);
    assert!(!response.success);
    assert!(!response.valid);
    assert!(f.store.get("42").await.unwrap().is_none());
}

#[tokio::test]
async fn validator_error_counts_as_rejection() {
    let f = fixture(MockValidator::failing());
    let response = submit_json(&f.state, r#"{"description": "a red fox"}"#).await;
    assert_eq!(response.message, MSG_REJECTED);
}

#[tokio::test]
async fn recent_update_is_rate_limited() {
    let f = fixture(MockValidator::accepting());
    let now = chrono::Utc::now().to_rfc3339();
    f.store.insert("42", "old", &now).await;

    let response = submit_json(&f.state, r#"{"description": "a red fox"}"#).await;
    assert!(!response.success);
    assert!(!response.valid);
    assert!(response.message.contains("once every 10 seconds"));
    assert!(f.validator.calls().await.is_empty());
}

#[tokio::test]
async fn old_update_is_not_rate_limited() {
    let f = fixture(MockValidator::accepting());
    f.store.insert("42", "old", "2024-01-01T00:00:00Z").await;

    let response = submit_json(&f.state, r#"{"description": "a red fox"}"#).await;
    assert!(response.success);
}

#[tokio::test]
async fn save_failure_after_acceptance() {
    let f = fixture(MockValidator::accepting());
    f.store.set_failing(true);

    let response = submit_json(&f.state, r#"{"description": "a red fox"}"#).await;
    assert_eq!(response, SubmitDescriptionResponse {
        success: false,
        message: MSG_SAVE_FAILED.into(),
        valid: true,
    });
}

#[tokio::test]
async fn bad_requests_are_rejected_up_front() {
    let f = fixture(MockValidator::accepting());

    let (status, _) = call(&f.state, submit(Some("42"), r#"{"description": "   "}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(&f.state, submit(Some("42"), "not json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(&f.state, submit(None, r#"{"description": "a red fox"}"#)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = call(&f.state, Request::get("/api/user-data").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(f.validator.calls().await.is_empty());
}

#[tokio::test]
async fn generated_images_are_served_under_prefix() {
    let f = fixture(MockValidator::accepting());
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("img_ann_20240101_120000.png"), b"png-bytes").unwrap();
    let config = RelayConfig {
        output_dir: dir.path().display().to_string(),
        ..RelayConfig::default()
    };

    let response = router(&config, f.state.clone())
        .oneshot(
            Request::get("/output_images/img_ann_20240101_120000.png")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], b"png-bytes");

    let missing = router(&config, f.state.clone())
        .oneshot(Request::get("/output_images/nope.png").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn websocket_session_greets_heartbeats_and_acknowledges() {
    let f = fixture(MockValidator::accepting());
    let state = f.state.clone();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let cancel = CancellationToken::new();
    let server = tokio::spawn(serve_on(
        listener,
        router(&RelayConfig::default(), state.clone()),
        cancel.clone(),
    ));

    let (mut socket, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws"))
        .await
        .unwrap();

    let welcome = next_json(&mut socket).await;
    assert_eq!(welcome["type"], "connection");
    assert_eq!(welcome["data"], "Connected to ready-event relay");
    assert_eq!(state.registry.len(), 1);

    socket.send(Message::Text(r#"{"type":"ping"}"#.into())).await.unwrap();
    let pong = next_json(&mut socket).await;
    assert_eq!(pong["type"], "pong");

    state.gate.begin().await;
    socket
        .send(Message::Text(r#"{"type":"event_acknowledged"}"#.into()))
        .await
        .unwrap();
    assert!(state.gate.wait(Duration::from_secs(5)).await);
    state.gate.finish().await;

    socket.close(None).await.unwrap();
    for _ in 0..100 {
        if state.registry.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(state.registry.is_empty());

    cancel.cancel();
    state.shutdown.cancel();
    server.await.unwrap().unwrap();
}

async fn next_json<S>(socket: &mut S) -> Value
where
    S: StreamExt<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    loop {
        let message = tokio::time::timeout(Duration::from_secs(5), socket.next())
            .await
            .expect("timed out waiting for frame")
            .expect("socket closed")
            .unwrap();
        if let Message::Text(text) = message {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}
