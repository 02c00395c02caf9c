//! Error types for brick requests

use brick_types::RecordId;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Field-level validation error codes of configuration forms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldErrorCode {
    Empty,
    MalformedJson,
    WrongShape,
    UsedTwice,
    InvalidChoice,
    InvalidHat,
}

impl FieldErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldErrorCode::Empty => "empty",
            FieldErrorCode::MalformedJson => "malformed_json",
            FieldErrorCode::WrongShape => "wrong_shape",
            FieldErrorCode::UsedTwice => "used_twice",
            FieldErrorCode::InvalidChoice => "invalid_choice",
            FieldErrorCode::InvalidHat => "invalid_hat",
        }
    }
}

/// One field error
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub code: FieldErrorCode,
    pub message: String,
}

/// Field errors of one form submission
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(Vec<FieldError>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: impl Into<String>, code: FieldErrorCode, message: impl Into<String>) {
        self.0.push(FieldError {
            field: field.into(),
            code,
            message: message.into(),
        });
    }

    pub fn single(field: impl Into<String>, code: FieldErrorCode, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.push(field, code, message);
        errors
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }

    pub fn has_code(&self, code: FieldErrorCode) -> bool {
        self.0.iter().any(|e| e.code == code)
    }

    /// `Ok(())` when empty.
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(ControlError::Validation(self))
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

/// Brick request error type
#[derive(Debug, Error)]
pub enum ControlError {
    /// Configuration form rejected
    #[error("Invalid configuration: {0}")]
    Validation(FieldErrors),

    /// Reload request without any brick id
    #[error("No brick id given")]
    EmptyRequest,

    /// Host record of a detail request does not exist
    #[error("Record not found: {0}")]
    RecordNotFound(RecordId),

    /// The user may not perform this request at all
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Store error
    #[error("Store error: {0}")]
    Store(#[from] brick_store::StoreError),

    /// Registry error
    #[error("Registry error: {0}")]
    Registry(#[from] brick_registry::RegistryError),
}

impl ControlError {
    pub fn forbidden(reason: impl Into<String>) -> Self {
        Self::Forbidden(reason.into())
    }

    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            ControlError::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}

/// Result type for brick requests
pub type Result<T> = std::result::Result<T, ControlError>;
