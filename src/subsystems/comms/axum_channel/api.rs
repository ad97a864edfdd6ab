//! Axum handlers for `/api/*` routes.
//!
//! Each handler receives [`AxumState`] via [`axum::extract::State`]. Calls
//! that reach the model are wrapped in `tokio::time::timeout` and map a
//! timeout to 504.

use std::time::Duration;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use super::AxumState;

const TURN_TIMEOUT: Duration = Duration::from_secs(120);
const DREAM_TIMEOUT: Duration = Duration::from_secs(180);

#[derive(Deserialize)]
pub(super) struct MessageRequest {
    message: String,
}

/// Build a JSON error response body.
fn json_error(code: &str, msg: impl std::fmt::Display) -> Json<serde_json::Value> {
    Json(json!({ "error": code, "message": format!("{msg}") }))
}

fn timed_out(what: &str) -> Response {
    (StatusCode::GATEWAY_TIMEOUT, json_error("timeout", format!("{what} timed out"))).into_response()
}

/// GET /api/health
pub(super) async fn health(State(state): State<AxumState>) -> Response {
    let body = json!({
        "status": "ok",
        "bot_name": state.comms.bot_name(),
        "channel_id": &*state.channel_id,
        "provider": state.comms.provider_name(),
        "api_configured": state.comms.api_configured(),
    });
    (StatusCode::OK, Json(body)).into_response()
}

/// POST /api/message
pub(super) async fn message(
    State(state): State<AxumState>,
    Json(req): Json<MessageRequest>,
) -> Response {
    if req.message.trim().is_empty() {
        return (StatusCode::BAD_REQUEST, json_error("bad_request", "message must not be empty"))
            .into_response();
    }

    match tokio::time::timeout(
        TURN_TIMEOUT,
        state.comms.send_message(&state.channel_id, &req.message),
    )
    .await
    {
        Ok(Ok(reply)) => (StatusCode::OK, Json(reply)).into_response(),
        Ok(Err(e)) => {
            warn!(channel_id = %state.channel_id, "message failed: {e}");
            (StatusCode::BAD_REQUEST, json_error("bad_request", e)).into_response()
        }
        Err(_) => timed_out("LLM request"),
    }
}

/// POST /api/thought
pub(super) async fn thought(State(state): State<AxumState>) -> Response {
    match tokio::time::timeout(TURN_TIMEOUT, state.comms.think()).await {
        Ok(reply) => (StatusCode::OK, Json(reply)).into_response(),
        Err(_) => timed_out("thought"),
    }
}

/// POST /api/dream
pub(super) async fn dream(State(state): State<AxumState>) -> Response {
    match tokio::time::timeout(DREAM_TIMEOUT, state.comms.dream()).await {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(_) => timed_out("dream"),
    }
}

/// GET /api/dream/latest
pub(super) async fn latest_dream(State(state): State<AxumState>) -> Response {
    match state.comms.latest_dream().await {
        Some(dream) => (StatusCode::OK, Json(dream)).into_response(),
        None => (StatusCode::NOT_FOUND, json_error("not_found", "no dream yet")).into_response(),
    }
}

/// GET /api/report
pub(super) async fn report(State(state): State<AxumState>) -> Response {
    (StatusCode::OK, Json(state.comms.report().await)).into_response()
}

/// GET /api/messages
pub(super) async fn messages(State(state): State<AxumState>) -> Response {
    (StatusCode::OK, Json(state.comms.transcript().await)).into_response()
}
