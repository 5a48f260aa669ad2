use crate::{
    models::video::ProcessingStatus,
    services::{auth::AuthError, blob_store::StorageError},
};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;
use thiserror::Error;

/// Domain failures of the video metadata core.
#[derive(Debug, Error)]
pub enum VideoError {
    /// Absent, or filtered out by visibility/status. Callers cannot tell which.
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0}")]
    Validation(String),
    #[error("cannot move processing status from {from} to {to}")]
    InvalidTransition {
        from: ProcessingStatus,
        to: ProcessingStatus,
    },
    #[error("content key `{0}` is already registered")]
    DuplicateContentKey(String),
    #[error(transparent)]
    Persistence(#[from] sqlx::Error),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub type VideoResult<T> = Result<T, VideoError>;

/// HTTP-facing error: a status, a stable classification and a readable detail.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl AppError {
    pub fn new(status: StatusCode, code: &'static str, msg: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: msg.into(),
        }
    }

    /// 500 with a generic detail; the cause is logged, never returned.
    pub fn internal(cause: impl fmt::Display) -> Self {
        tracing::error!(error = %cause, "unclassified failure");
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_ERROR",
            "An internal error occurred",
        )
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", msg)
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.code,
            "detail": self.message,
            "status": self.status.as_u16()
        }));

        (self.status, body).into_response()
    }
}

impl From<VideoError> for AppError {
    fn from(err: VideoError) -> Self {
        match err {
            VideoError::NotFound(_) => AppError::not_found(err.to_string()),
            VideoError::Validation(msg) => {
                AppError::new(StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR", msg)
            }
            VideoError::InvalidTransition { .. } => {
                AppError::new(StatusCode::CONFLICT, "INVALID_TRANSITION", err.to_string())
            }
            VideoError::DuplicateContentKey(_) => {
                AppError::new(StatusCode::CONFLICT, "PERSISTENCE_CONFLICT", err.to_string())
            }
            VideoError::Persistence(cause) => {
                tracing::error!(error = %cause, "store of record failure");
                AppError::new(
                    StatusCode::SERVICE_UNAVAILABLE,
                    "PERSISTENCE_ERROR",
                    "The metadata store is unavailable, retry later",
                )
            }
            VideoError::Storage(cause) => AppError::from(cause),
        }
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        tracing::error!(error = %err, "blob store failure");
        AppError::new(
            StatusCode::BAD_GATEWAY,
            "STORAGE_ERROR",
            "Could not issue an upload URL",
        )
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        tracing::debug!(error = %err, "rejected credentials");
        AppError::unauthorized(err.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::internal(err)
    }
}
