//! Error types for brickd

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use brick_control::{ControlError, FieldErrors};
use brick_registry::RegistryError;
use brick_store::StoreError;
use serde::Serialize;
use thiserror::Error;

/// Daemon-level errors
#[derive(Debug, Error)]
pub enum DaemonError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Brick catalog could not be built
    #[error("Catalog error: {0}")]
    Catalog(#[from] RegistryError),

    /// Server startup error
    #[error("Server error: {0}")]
    Server(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// API-specific errors
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Request not allowed for this user
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Conflict
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Configuration form rejected
    #[error("Validation error: {0}")]
    Validation(FieldErrors),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => ApiError::NotFound(what),
            StoreError::Conflict(reason) => ApiError::Conflict(reason.to_string()),
            err @ StoreError::UniqueViolation { .. } => ApiError::Conflict(err.to_string()),
            StoreError::Backend(msg) => ApiError::Internal(msg),
        }
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound(id) => ApiError::NotFound(format!("Brick {}", id)),
            RegistryError::PermissionDenied(reason) => ApiError::Forbidden(reason),
            RegistryError::Store(err) => err.into(),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<ControlError> for ApiError {
    fn from(err: ControlError) -> Self {
        match err {
            ControlError::Validation(errors) => ApiError::Validation(errors),
            ControlError::EmptyRequest => ApiError::BadRequest(err.to_string()),
            ControlError::RecordNotFound(id) => ApiError::NotFound(format!("Record {}", id)),
            ControlError::Forbidden(reason) => ApiError::Forbidden(reason),
            ControlError::Store(err) => err.into(),
            ControlError::Registry(err) => err.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            ApiError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let details = match &self {
            ApiError::Validation(errors) => serde_json::to_value(errors).ok(),
            _ => None,
        };
        let body = ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for API operations
pub type ApiResult<T> = Result<T, ApiError>;

/// Result type alias for daemon operations
pub type DaemonResult<T> = Result<T, DaemonError>;

#[cfg(test)]
mod tests {
    use super::*;
    use brick_control::FieldErrorCode;
    use brick_store::ConflictReason;

    #[test]
    fn test_api_error_status_codes() {
        assert_eq!(
            ApiError::NotFound("test".to_string()).into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Forbidden("test".to_string()).into_response().status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::Validation(FieldErrors::single("top", FieldErrorCode::UsedTwice, "twice"))
                .into_response()
                .status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn test_control_errors_map_to_statuses() {
        let status = |err: ControlError| ApiError::from(err).into_response().status();

        assert_eq!(status(ControlError::EmptyRequest), StatusCode::BAD_REQUEST);
        assert_eq!(status(ControlError::RecordNotFound("c1".into())), StatusCode::NOT_FOUND);
        assert_eq!(status(ControlError::forbidden("no")), StatusCode::FORBIDDEN);
        assert_eq!(
            status(ControlError::Store(StoreError::Conflict(
                ConflictReason::DefaultLayerProtected
            ))),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status(ControlError::Store(StoreError::Backend("down".into()))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
