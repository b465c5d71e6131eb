//! Error types for triage-server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Decision graph and response matcher errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InterviewError {
    #[error("Unknown interview node: {0}")]
    UnknownNode(String),

    /// Option index outside the current node's option list
    #[error("Invalid transition at '{node}': option {index} of {count}")]
    InvalidTransition {
        node: String,
        index: usize,
        count: usize,
    },

    /// No further transitions once the terminal node is reached
    #[error("Interview already complete at '{0}'")]
    Terminal(String),

    #[error("Node '{0}' does not take a duration")]
    NotDurationNode(String),

    /// Free text matched none of the current options
    #[error("Could not match response at '{0}'")]
    NoMatch(String),

    /// Caller-supplied state disagrees with a replay of its own log
    #[error("Conversation state is inconsistent: {0}")]
    InconsistentState(String),

    #[error("Invalid interview graph: {0}")]
    InvalidGraph(String),
}

/// External collaborator (imaging classifier, conversational model) errors
#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("{0} timed out after {1}s")]
    Timeout(&'static str, u64),

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("{0} is not configured")]
    NotConfigured(&'static str),
}

impl From<reqwest::Error> for CollaboratorError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            CollaboratorError::Parse(err.to_string())
        } else {
            CollaboratorError::Network(err.to_string())
        }
    }
}

/// Sync reconciler errors; all are retried on a later cycle
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Remote store unreachable: {0}")]
    Unreachable(String),

    #[error("Remote store rejected record: HTTP {0}")]
    Remote(u16),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Local store error: {0}")]
    Store(#[from] triage_common::Error),
}

impl From<sqlx::Error> for SyncError {
    fn from(err: sqlx::Error) -> Self {
        SyncError::Store(triage_common::Error::Database(err))
    }
}

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Conflict (409), e.g. a sync cycle already running
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error(transparent)]
    Interview(#[from] InterviewError),

    /// triage-common error
    #[error("Common error: {0}")]
    Common(#[from] triage_common::Error),
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError::Common(triage_common::Error::Database(err))
    }
}

impl From<SyncError> for ApiError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::Store(e) => ApiError::Common(e),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
            ApiError::Interview(ref err) => {
                let code = match err {
                    InterviewError::InvalidGraph(_) => "GRAPH_ERROR",
                    InterviewError::Terminal(_) => "INTERVIEW_COMPLETE",
                    _ => "INVALID_TRANSITION",
                };
                let status = match err {
                    InterviewError::InvalidGraph(_) => StatusCode::INTERNAL_SERVER_ERROR,
                    InterviewError::Terminal(_) => StatusCode::CONFLICT,
                    _ => StatusCode::BAD_REQUEST,
                };
                (status, code, err.to_string())
            }
            ApiError::Common(ref err) => match err {
                triage_common::Error::InvalidInput(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                triage_common::Error::NotFound(msg) => {
                    (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone())
                }
                other => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "COMMON_ERROR",
                    other.to_string(),
                ),
            },
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
