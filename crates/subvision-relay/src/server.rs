// SPDX-FileCopyrightText: 2026 SubVision Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Relay HTTP server built on axum.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    routing::{get, post},
};
use subvision_config::model::RelayConfig;
use subvision_core::{ContentValidator, DescriptionStore, SubvisionError};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::ack::AckGate;
use crate::handlers;
use crate::registry::ConnectionRegistry;
use crate::ws;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct RelayState {
    pub registry: Arc<ConnectionRegistry>,
    pub gate: Arc<AckGate>,
    pub descriptions: Arc<dyn DescriptionStore + Send + Sync>,
    pub validator: Arc<dyn ContentValidator + Send + Sync>,
    /// Outbound frames buffered per client before it counts as stalled.
    pub client_buffer: usize,
    /// Minimum interval between description updates for one user.
    pub submission_cooldown: Duration,
    /// Cancelled on process shutdown; ends open WebSocket sessions.
    pub shutdown: CancellationToken,
}

/// Build the relay router:
/// - GET /ws
/// - GET /health
/// - GET /api/user-data
/// - POST /api/submit-description
/// - generated images under the configured prefix, assets under /static
pub fn router(config: &RelayConfig, state: RelayState) -> Router {
    let mut app = Router::new()
        .route("/ws", get(ws::ws_handler))
        .route("/health", get(handlers::get_health))
        .route("/api/user-data", get(handlers::get_user_data))
        .route("/api/submit-description", post(handlers::submit_description))
        .nest_service("/static", ServeDir::new(&config.static_dir));

    let images = config.image_path_prefix.trim_end_matches('/');
    app = if images.is_empty() {
        app.fallback_service(ServeDir::new(&config.output_dir))
    } else {
        app.nest_service(images, ServeDir::new(&config.output_dir))
    };

    app.layer(TraceLayer::new_for_http()).with_state(state)
}

/// Bind to the configured address and serve until `cancel` fires.
pub async fn serve(
    config: &RelayConfig,
    state: RelayState,
    cancel: CancellationToken,
) -> Result<(), SubvisionError> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| SubvisionError::Transport {
            message: format!("failed to bind relay to {addr}: {e}"),
        })?;
    serve_on(listener, router(config, state), cancel).await
}

/// Serve `app` on an already-bound listener until `cancel` fires.
pub async fn serve_on(
    listener: TcpListener,
    app: Router,
    cancel: CancellationToken,
) -> Result<(), SubvisionError> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!("relay server listening on {addr}");
    }
    axum::serve(listener, app)
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await
        .map_err(|e| SubvisionError::Transport {
            message: format!("relay server error: {e}"),
        })
}
