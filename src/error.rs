use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::services::bridge::BridgeError;
use crate::services::dispatcher::DispatchError;
use crate::services::media::MediaError;
use crate::services::storage::StorageError;

/// Error surfaced by an HTTP handler, mapped to a status code at the route
/// boundary. Resource-acquisition failures (broker, bus) are reported as 503
/// so callers can retry the whole operation.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("task dispatch failed: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("stream subscription failed: {0}")]
    Bridge(#[from] BridgeError),

    #[error("storage operation failed: {0}")]
    Storage(#[from] StorageError),

    #[error("media segmentation failed: {0}")]
    Media(#[from] MediaError),

    #[error("database operation failed: {0}")]
    Database(#[from] sqlx::Error),

    #[error("invalid upload: {0}")]
    Upload(#[from] MultipartError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::Upload(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) | ApiError::Storage(StorageError::NotFound(_)) => {
                StatusCode::NOT_FOUND
            }
            ApiError::Dispatch(_) | ApiError::Bridge(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Storage(_) | ApiError::Media(_) | ApiError::Database(_) | ApiError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(error = %self, "Request rejected");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
