//! Error types for the relay
//!
//! This module defines the HTTP-facing error type. Upstream client errors live
//! in `upstream::error` and never reach callers directly; the relay folds them
//! into a `Fail` envelope.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Message returned to callers that fail the access gate
pub const NO_ACCESS_RIGHTS: &str = "Error: 无访问权限 | No access rights";

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Unauthorized(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Body sent when the access gate denies a request
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub message: String,
    pub data: Option<()>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, label, message) = match &self {
            // The web client inspects the body, not the status line
            AppError::Unauthorized(msg) => (StatusCode::OK, "Unauthorized", msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "Fail", msg.clone()),
            AppError::Internal(e) => {
                tracing::error!(error = %e, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Fail",
                    "Internal server error".to_string(),
                )
            }
        };

        let body = StatusResponse {
            status: label,
            message,
            data: None,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;
