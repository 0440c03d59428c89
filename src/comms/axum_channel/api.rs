//! Axum handlers for `/api/*` routes.

use std::time::Duration;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;
use uuid::Uuid;

use super::AxumState;

const MESSAGE_TIMEOUT: Duration = Duration::from_secs(120);
const DEFAULT_ACTIONS_LIMIT: usize = 8;

// ── Request types ─────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub(super) struct MessageRequest {
    message: String,
    #[serde(default)]
    session_id: Option<String>,
}

#[derive(Deserialize)]
pub(super) struct ActionsQuery {
    limit: Option<usize>,
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn json_error(status: StatusCode, code: &str, msg: impl std::fmt::Display) -> Response {
    (status, Json(json!({ "error": code, "message": format!("{msg}") }))).into_response()
}

/// A client-supplied session id. Anything that is not a UUID is ignored and
/// the caller gets a fresh session.
fn parse_session_id(raw: Option<&str>) -> Option<Uuid> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| Uuid::parse_str(s).ok())
        .filter(|id| !id.is_nil())
}

// ── Handlers ──────────────────────────────────────────────────────────────────

/// GET /api/health
pub(super) async fn health(State(state): State<AxumState>) -> Response {
    Json(json!({
        "status": "ok",
        "sessions": state.comms.session_count(),
        "provider": state.comms.provider_name(),
    }))
    .into_response()
}

/// POST /api/message
pub(super) async fn message(State(state): State<AxumState>, Json(req): Json<MessageRequest>) -> Response {
    let text = req.message.trim();
    if text.is_empty() {
        return json_error(StatusCode::BAD_REQUEST, "bad_request", "message must not be empty");
    }
    let session_id = parse_session_id(req.session_id.as_deref());

    match tokio::time::timeout(MESSAGE_TIMEOUT, state.comms.send_message(session_id, text)).await {
        Ok(reply) => (StatusCode::OK, Json(reply)).into_response(),
        Err(_) => {
            warn!(channel_id = %state.channel_id, "message handling timed out");
            json_error(StatusCode::GATEWAY_TIMEOUT, "timeout", "LLM request timed out")
        }
    }
}

/// GET /api/session/{session_id}
pub(super) async fn session_detail(State(state): State<AxumState>, Path(session_id): Path<String>) -> Response {
    let Some(id) = parse_session_id(Some(&session_id)) else {
        return json_error(StatusCode::NOT_FOUND, "not_found", format!("no session {session_id}"));
    };
    match state.comms.session_snapshot(id).await {
        Some(snap) => Json(snap).into_response(),
        None => json_error(StatusCode::NOT_FOUND, "not_found", format!("no session {session_id}")),
    }
}

/// POST /api/session/{session_id}/reset
pub(super) async fn session_reset(State(state): State<AxumState>, Path(session_id): Path<String>) -> Response {
    let existed = match parse_session_id(Some(&session_id)) {
        Some(id) => state.comms.reset_session(id).await,
        None => false,
    };
    Json(json!({
        "session_id": session_id,
        "reset": existed,
        "status": state.comms.idle_status(),
    }))
    .into_response()
}

/// GET /api/actions?limit=N
pub(super) async fn actions(State(state): State<AxumState>, Query(q): Query<ActionsQuery>) -> Response {
    let limit = q.limit.unwrap_or(DEFAULT_ACTIONS_LIMIT);
    match state.comms.recent_actions(limit) {
        Ok(view) => Json(view).into_response(),
        Err(e) => {
            warn!(channel_id = %state.channel_id, "listing outbox failed: {e}");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal", e)
        }
    }
}

/// DELETE /api/actions
pub(super) async fn clear_actions(State(state): State<AxumState>) -> Response {
    match state.comms.clear_actions() {
        Ok(deleted) => Json(json!({ "deleted": deleted })).into_response(),
        Err(e) => {
            warn!(channel_id = %state.channel_id, "clearing outbox failed: {e}");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal", e)
        }
    }
}
