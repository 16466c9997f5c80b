use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

use crate::services::store::StoreError;

/// A lightweight wrapper for general errors that keeps the message local.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    /// Shortcut for a 500 Internal Server Error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    /// Shortcut for 404 Not Found
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.message,
            "status": self.status.as_u16()
        }));

        (self.status, body).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::internal(err.to_string())
    }
}

/// Map service failures onto the HTTP taxonomy: missing entities are 404,
/// uniqueness violations 409, rejected writes and malformed references 422,
/// everything else 500.
impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        let status = match &err {
            StoreError::ContentNotFound(_)
            | StoreError::MetadataNotFound(_)
            | StoreError::MetadataTypeNotFound(_)
            | StoreError::ImageNotFound(_)
            | StoreError::VersionNotFound(_)
            | StoreError::FolderNotFound(_) => StatusCode::NOT_FOUND,
            StoreError::FileAlreadyExists(_) | StoreError::Duplicate { .. } => {
                StatusCode::CONFLICT
            }
            StoreError::StoredFileMissing(_)
            | StoreError::InvalidFileName
            | StoreError::InvalidImageGroup(_)
            | StoreError::UnknownReference(_)
            | StoreError::MalformedMetadataToken(_)
            | StoreError::FolderCycle(_) => StatusCode::UNPROCESSABLE_ENTITY,
            StoreError::Sqlx(inner) => {
                tracing::error!("database error: {}", inner);
                StatusCode::INTERNAL_SERVER_ERROR
            }
            StoreError::Io(inner) => {
                tracing::error!("I/O error: {}", inner);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        AppError::new(status, err.to_string())
    }
}
