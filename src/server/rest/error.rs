use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;
use utoipa::ToSchema;

use crate::docker::LifecycleError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorDetails {
    pub code: String,
    pub message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            ApiError::Lifecycle(err) => {
                let (status, code) = match err {
                    LifecycleError::DeviceNotFound { .. } => (StatusCode::NOT_FOUND, "DEVICE_NOT_FOUND"),
                    LifecycleError::UnknownIdentity(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
                    LifecycleError::PortAllocationConflict { .. } => (StatusCode::CONFLICT, "PORT_CONFLICT"),
                    LifecycleError::PortRangeExhausted => (StatusCode::CONFLICT, "PORT_RANGE_EXHAUSTED"),
                    LifecycleError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR"),
                    LifecycleError::Storage { .. } | LifecycleError::OrphanedStorage { .. } => {
                        (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR")
                    }
                    _ => (StatusCode::INTERNAL_SERVER_ERROR, "RUNTIME_ERROR"),
                };
                (status, code, err.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }

        let error_response = ErrorResponse {
            error: ErrorDetails {
                code: code.to_string(),
                message,
            },
        };

        (status, Json(error_response)).into_response()
    }
}
