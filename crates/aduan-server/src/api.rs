//! Wire types for the chat endpoint: one JSON action envelope in, flat JSON
//! envelopes out. Shapes live here so they can be tested without a server.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use aduan_core::turns::ChatTurn;
use aduan_store::StoreError;
use aduan_triage::{Disposition, IntentTier, SessionSummary, TurnOutcome};

/// Envelope accepted by `POST /api/chat`. `action` selects the operation,
/// the remaining fields are per-action.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub action: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub history: Option<Vec<ChatTurn>>,
    #[serde(default)]
    pub consent_given: Option<bool>,
}

/// One processed turn as the client sees it.
///
/// `phase` carries the session phase, except on short-circuited turns where
/// it shows the transient disposition (`faq`, `emergency`, `off_topic`)
/// instead; those turns never move the stored phase.
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub success: bool,
    pub response: String,
    pub phase: String,
    pub tier: IntentTier,
    pub score: u32,
    pub message_count: u32,
    pub session_id: String,
    pub persisted: bool,
    pub consent_given: bool,
}

impl From<TurnOutcome> for ChatResponse {
    fn from(outcome: TurnOutcome) -> Self {
        let phase = match outcome.disposition {
            Disposition::Chat => outcome.phase.to_string(),
            transient => transient.label().to_string(),
        };
        Self {
            success: true,
            response: outcome.response,
            phase,
            tier: outcome.tier,
            score: outcome.score,
            message_count: outcome.message_count,
            session_id: outcome.session_id,
            persisted: outcome.persisted,
            consent_given: outcome.consent_given,
        }
    }
}

/// Mirror of [`ChatResponse`] without the generated text; restore replays
/// classification but produces no reply.
#[derive(Debug, Serialize)]
pub struct RestoreResponse {
    pub success: bool,
    pub phase: String,
    pub tier: IntentTier,
    pub score: u32,
    pub message_count: u32,
    pub session_id: String,
    pub persisted: bool,
    pub consent_given: bool,
}

impl From<SessionSummary> for RestoreResponse {
    fn from(summary: SessionSummary) -> Self {
        Self {
            success: true,
            phase: summary.phase.to_string(),
            tier: summary.tier,
            score: summary.score,
            message_count: summary.message_count,
            session_id: summary.session_id,
            persisted: summary.persisted,
            consent_given: summary.consent_given,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ResetResponse {
    pub success: bool,
    pub session_id: String,
}

/// Request failures surfaced to the client. Everything else in the pipeline
/// degrades in place; only structurally invalid requests and the report read
/// path produce one of these.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("invalid JSON body: {0}")]
    Malformed(String),

    #[error("unknown action: {0}")]
    UnknownAction(String),

    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("message must not be empty")]
    EmptyMessage,

    #[error("history must not be empty")]
    EmptyHistory,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Malformed(_) => "invalid_json",
            ApiError::UnknownAction(_) => "unknown_action",
            ApiError::MissingField(_) => "missing_field",
            ApiError::EmptyMessage => "empty_message",
            ApiError::EmptyHistory => "empty_history",
            ApiError::NotFound(_) => "not_found",
            ApiError::Internal(_) => "internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    pub fn envelope(&self) -> serde_json::Value {
        serde_json::json!({
            "success": false,
            "error": {
                "code": self.code(),
                "message": self.to_string(),
            },
        })
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.envelope())).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(what) => ApiError::NotFound(what),
            other => ApiError::Internal(other.to_string()),
        }
    }
}
