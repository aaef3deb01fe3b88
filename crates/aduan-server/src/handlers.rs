//! Request handlers: the chat action endpoint, the report read path for the
//! case-management side, and health.
//!
//! The chat endpoint takes the raw body and parses it by hand so malformed
//! JSON gets the same error envelope as every other validation failure.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use aduan_core::ids::{ReportId, SessionId};

use crate::api::{ApiError, ChatRequest, ChatResponse, ResetResponse, RestoreResponse};
use crate::server::AppState;

/// `POST /api/chat`. One endpoint, three actions.
pub async fn chat_handler(State(state): State<AppState>, body: String) -> Response {
    let request: ChatRequest = match serde_json::from_str(&body) {
        Ok(req) => req,
        Err(e) => return ApiError::Malformed(e.to_string()).into_response(),
    };

    match request.action.as_str() {
        "chat" => respond(handle_chat(&state, request).await),
        "reset" => respond(handle_reset(&state, request)),
        "restore" => respond(handle_restore(&state, request)),
        other => ApiError::UnknownAction(other.to_string()).into_response(),
    }
}

fn respond<T: Serialize>(result: Result<T, ApiError>) -> Response {
    match result {
        Ok(body) => Json(body).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn handle_chat(state: &AppState, request: ChatRequest) -> Result<ChatResponse, ApiError> {
    let message = match request.message.as_deref().map(str::trim) {
        None => return Err(ApiError::MissingField("message")),
        Some("") => return Err(ApiError::EmptyMessage),
        Some(m) => m.to_string(),
    };

    // First-contact clients have no id yet; the server mints one.
    let session_id = request
        .session_id
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| SessionId::new().to_string());

    let outcome = state.engine.chat(&session_id, &message).await;
    Ok(ChatResponse::from(outcome))
}

fn handle_reset(state: &AppState, request: ChatRequest) -> Result<ResetResponse, ApiError> {
    let Some(session_id) = request.session_id.filter(|s| !s.trim().is_empty()) else {
        return Err(ApiError::MissingField("session_id"));
    };
    state.engine.reset(&session_id);
    Ok(ResetResponse {
        success: true,
        session_id,
    })
}

fn handle_restore(state: &AppState, request: ChatRequest) -> Result<RestoreResponse, ApiError> {
    let Some(session_id) = request.session_id.filter(|s| !s.trim().is_empty()) else {
        return Err(ApiError::MissingField("session_id"));
    };
    let Some(history) = request.history else {
        return Err(ApiError::MissingField("history"));
    };
    if history.is_empty() {
        return Err(ApiError::EmptyHistory);
    }
    let consent_given = request.consent_given.unwrap_or(false);

    let summary = state.engine.restore(&session_id, history, consent_given);
    Ok(RestoreResponse::from(summary))
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub limit: Option<u32>,
}

/// `GET /api/reports`. Newest first, default 20, capped at 100.
pub async fn reports_list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Response {
    respond(list_reports(&state, params.limit.unwrap_or(20).min(100)))
}

fn list_reports(state: &AppState, limit: u32) -> Result<serde_json::Value, ApiError> {
    let reports = state.reports.list_recent(limit)?;
    Ok(serde_json::json!({
        "success": true,
        "reports": reports,
    }))
}

/// `GET /api/reports/{id}`. The report row plus its persisted transcript.
pub async fn report_get(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    respond(fetch_report(&state, &id))
}

fn fetch_report(state: &AppState, raw_id: &str) -> Result<serde_json::Value, ApiError> {
    let id = ReportId::from_raw(raw_id);
    let report = state.reports.get(&id)?;
    let messages = state.reports.turns_for(&id)?;
    Ok(serde_json::json!({
        "success": true,
        "report": report,
        "messages": messages,
    }))
}

/// `GET /health`. Probes the store and reports the day's quota ledger.
pub async fn health_handler(State(state): State<AppState>) -> Response {
    let (status, body) = health_payload(&state);
    (status, Json(body)).into_response()
}

fn health_payload(state: &AppState) -> (StatusCode, serde_json::Value) {
    let db_ok = state
        .db
        .with_conn(|conn| {
            conn.execute_batch("SELECT 1")?;
            Ok(true)
        })
        .unwrap_or(false);

    let quota = state.client.quota_snapshot();

    let body = serde_json::json!({
        "status": if db_ok { "healthy" } else { "degraded" },
        "components": {
            "database": if db_ok { "ok" } else { "error" },
        },
        "quota": quota,
    });

    let status = if db_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, body)
}
