use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::path::Path;
use thiserror::Error;

use crate::upstream::SchemaId;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Schema not found: id={id}")]
    SchemaNotFound { id: SchemaId },

    #[error("Schema rejected for subject {subject}: {cause}")]
    InvalidSchema { subject: String, cause: String },

    #[error("Upstream registry returned {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("Upstream registry unreachable: {cause}")]
    Transport { cause: String },

    #[error("Failed to read snapshot {path}: {cause}")]
    SnapshotRead { path: String, cause: String },

    #[error("Failed to write snapshot {path}: {cause}")]
    SnapshotWrite { path: String, cause: String },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl RegistryError {
    pub(crate) fn snapshot_read(path: &Path, cause: impl ToString) -> Self {
        RegistryError::SnapshotRead {
            path: path.display().to_string(),
            cause: cause.to_string(),
        }
    }

    pub(crate) fn snapshot_write(path: &Path, cause: impl ToString) -> Self {
        RegistryError::SnapshotWrite {
            path: path.display().to_string(),
            cause: cause.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
}

impl IntoResponse for RegistryError {
    fn into_response(self) -> Response {
        let (status, error_response) = match &self {
            RegistryError::SchemaNotFound { id } => (
                StatusCode::NOT_FOUND,
                ErrorResponse {
                    error: "schema_not_found".to_string(),
                    message: format!("Schema {} not found", id),
                    cause: None,
                },
            ),
            RegistryError::InvalidSchema { subject, cause } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorResponse {
                    error: "invalid_schema".to_string(),
                    message: format!("Schema rejected for subject '{}'", subject),
                    cause: Some(cause.clone()),
                },
            ),
            RegistryError::Upstream { status, message } => (
                StatusCode::BAD_GATEWAY,
                ErrorResponse {
                    error: "upstream_error".to_string(),
                    message: format!("Upstream registry returned status {}", status),
                    cause: Some(message.clone()),
                },
            ),
            RegistryError::Transport { cause } => (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorResponse {
                    error: "upstream_unavailable".to_string(),
                    message: "Upstream registry is unreachable".to_string(),
                    cause: Some(cause.clone()),
                },
            ),
            RegistryError::SnapshotRead { path, cause } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse {
                    error: "snapshot_read_failed".to_string(),
                    message: format!("Failed to read cache snapshot '{}'", path),
                    cause: Some(cause.clone()),
                },
            ),
            RegistryError::SnapshotWrite { path, cause } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse {
                    error: "snapshot_write_failed".to_string(),
                    message: format!("Failed to write cache snapshot '{}'", path),
                    cause: Some(cause.clone()),
                },
            ),
            RegistryError::InvalidRequest { message } => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    error: "invalid_request".to_string(),
                    message: message.clone(),
                    cause: None,
                },
            ),
            RegistryError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse {
                    error: "internal_error".to_string(),
                    message: msg.clone(),
                    cause: None,
                },
            ),
        };

        (status, Json(error_response)).into_response()
    }
}

impl From<reqwest::Error> for RegistryError {
    fn from(err: reqwest::Error) -> Self {
        RegistryError::Transport {
            cause: err.to_string(),
        }
    }
}

impl From<tokio::task::JoinError> for RegistryError {
    fn from(err: tokio::task::JoinError) -> Self {
        RegistryError::Internal(format!("Background task failed: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, RegistryError>;
