use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::engine::lifecycle::LifecycleError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// The backend refused because the request changed underneath the
    /// caller. Refetch before trying again.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Network failure or timeout talking to the backend.
    #[error("backend unreachable: {0}")]
    Transport(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, AppError::Conflict(_))
    }

    pub fn outcome_label(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "not_found",
            AppError::BadRequest(_) => "bad_request",
            AppError::Validation(_) => "validation",
            AppError::Conflict(_) => "conflict",
            AppError::Transport(_) => "transport",
            AppError::Internal(_) => "internal",
        }
    }
}

impl From<LifecycleError> for AppError {
    fn from(err: LifecycleError) -> Self {
        AppError::Validation(vec![err.to_string()])
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, json!({ "error": msg })),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            AppError::Validation(violations) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({
                    "error": "validation failed",
                    "violations": violations,
                }),
            ),
            AppError::Conflict(msg) => (
                StatusCode::CONFLICT,
                json!({
                    "error": msg,
                    "refetch": true,
                }),
            ),
            AppError::Transport(msg) => (
                StatusCode::BAD_GATEWAY,
                json!({
                    "error": msg,
                    "retryable": true,
                }),
            ),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": msg })),
        };

        (status, Json(body)).into_response()
    }
}
