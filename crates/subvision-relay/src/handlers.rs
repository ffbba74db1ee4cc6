// SPDX-FileCopyrightText: 2026 SubVision Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP handlers: health and the description-submission API.
//!
//! The caller's identity comes from headers set by an upstream
//! authenticating proxy: `x-user-id` (required) and `x-username`.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info, warn};

use crate::server::RelayState;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USERNAME_HEADER: &str = "x-username";

pub const MSG_SAVED: &str = "Description accepted and saved successfully!";
pub const MSG_SAVE_FAILED: &str = "Description was accepted but failed to save. Please try again.";
pub const MSG_REJECTED: &str =
    "Description was rejected by our validation system. Please provide a more appropriate description.";

/// Response body for GET /health.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub clients: usize,
    pub awaiting_ack: bool,
}

/// Response body for GET /api/user-data.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDataResponse {
    pub user_id: String,
    pub username: String,
    pub description: String,
    pub last_updated: String,
}

/// Request body for POST /api/submit-description.
#[derive(Debug, Deserialize)]
pub struct SubmitDescriptionRequest {
    #[serde(default)]
    pub description: String,
}

/// Response body for POST /api/submit-description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitDescriptionResponse {
    pub success: bool,
    pub message: String,
    pub valid: bool,
}

impl SubmitDescriptionResponse {
    fn new(success: bool, message: impl Into<String>, valid: bool) -> Self {
        Self {
            success,
            message: message.into(),
            valid,
        }
    }
}

/// GET /health
pub async fn get_health(State(state): State<RelayState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        clients: state.registry.len(),
        awaiting_ack: state.gate.is_awaiting(),
    })
}

/// GET /api/user-data
pub async fn get_user_data(State(state): State<RelayState>, headers: HeaderMap) -> Response {
    let Some(user_id) = header_value(&headers, USER_ID_HEADER) else {
        return unauthorized();
    };
    let username = header_value(&headers, USERNAME_HEADER).unwrap_or_default();

    match state.descriptions.get(&user_id).await {
        Ok(found) => {
            let (description, last_updated) = found
                .map(|d| (d.description, d.last_updated))
                .unwrap_or_default();
            Json(UserDataResponse {
                user_id,
                username,
                description,
                last_updated,
            })
            .into_response()
        }
        Err(e) => {
            error!(user_id = user_id.as_str(), error = %e, "description lookup failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "failed to load description"})),
            )
                .into_response()
        }
    }
}

/// POST /api/submit-description
pub async fn submit_description(
    State(state): State<RelayState>,
    headers: HeaderMap,
    body: Result<Json<SubmitDescriptionRequest>, JsonRejection>,
) -> Response {
    let Ok(Json(request)) = body else {
        return (StatusCode::BAD_REQUEST, "Invalid JSON").into_response();
    };
    let description = request.description.trim();
    if description.is_empty() {
        return (StatusCode::BAD_REQUEST, "Description is required").into_response();
    }
    let Some(user_id) = header_value(&headers, USER_ID_HEADER) else {
        return unauthorized();
    };

    if let Some(remaining) = cooldown_remaining(&state, &user_id).await {
        info!(user_id = user_id.as_str(), remaining_secs = remaining, "description update rate-limited");
        let message = format!(
            "You can only update your description once every {} seconds. Please wait a moment and try again.",
            state.submission_cooldown.as_secs()
        );
        return Json(SubmitDescriptionResponse::new(false, message, false)).into_response();
    }

    let valid = match state.validator.validate(description).await {
        Ok(valid) => valid,
        Err(e) => {
            warn!(user_id = user_id.as_str(), error = %e, "validation call failed, rejecting");
            false
        }
    };
    if !valid {
        info!(user_id = user_id.as_str(), "description rejected");
        return Json(SubmitDescriptionResponse::new(false, MSG_REJECTED, false)).into_response();
    }

    let response = match state.descriptions.put(&user_id, description).await {
        Ok(()) => {
            info!(user_id = user_id.as_str(), "description saved");
            SubmitDescriptionResponse::new(true, MSG_SAVED, true)
        }
        Err(e) => {
            error!(user_id = user_id.as_str(), error = %e, "description save failed");
            SubmitDescriptionResponse::new(false, MSG_SAVE_FAILED, true)
        }
    };
    Json(response).into_response()
}

/// Seconds left before `user_id` may update again, if still cooling down.
/// A failed lookup or unparseable timestamp does not block the update.
async fn cooldown_remaining(state: &RelayState, user_id: &str) -> Option<i64> {
    let last_updated = match state.descriptions.get(user_id).await {
        Ok(Some(existing)) => existing.last_updated,
        Ok(None) => return None,
        Err(e) => {
            warn!(user_id, error = %e, "last-updated lookup failed");
            return None;
        }
    };
    let last = DateTime::parse_from_rfc3339(&last_updated).ok()?;
    let elapsed = Utc::now().signed_duration_since(last);
    let cooldown = chrono::Duration::from_std(state.submission_cooldown).ok()?;
    (elapsed < cooldown).then(|| (cooldown - elapsed).num_seconds())
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"access": "unauthorized"})),
    )
        .into_response()
}
