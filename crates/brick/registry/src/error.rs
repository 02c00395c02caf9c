//! Registry error types

use brick_types::{InstanceClassId, PanelId, PanelKind, RecordType};
use thiserror::Error;

/// Registry errors
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Brick already registered: {0}")]
    DuplicateId(PanelId),

    #[error("Malformed brick id: {0}")]
    MalformedId(PanelId),

    #[error("Hat brick ids must be \"hat\" (main) or start with \"hat-\": {0}")]
    MalformedHatId(PanelId),

    #[error("A main hat brick is already registered for {0}")]
    DuplicateMainHat(RecordType),

    #[error("Instance brick class already registered: {0}")]
    DuplicateInstanceClass(InstanceClassId),

    #[error("Brick {id} cannot be registered statically (kind {kind})")]
    InvalidKind { id: PanelId, kind: PanelKind },

    #[error("Brick not found: {0}")]
    NotFound(PanelId),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Permission check failed: {0}")]
    PermissionCheckFailed(String),

    #[error("Record source error: {0}")]
    Source(String),

    #[error("Template error: {0}")]
    Template(String),

    #[error("Render error: {0}")]
    Render(String),

    #[error("Store error: {0}")]
    Store(#[from] brick_store::StoreError),
}

impl RegistryError {
    /// Errors raised while populating the registry at startup.
    pub fn is_registration(&self) -> bool {
        matches!(
            self,
            RegistryError::DuplicateId(_)
                | RegistryError::MalformedId(_)
                | RegistryError::MalformedHatId(_)
                | RegistryError::DuplicateMainHat(_)
                | RegistryError::DuplicateInstanceClass(_)
                | RegistryError::InvalidKind { .. }
        )
    }
}

/// Result type for registry operations
pub type Result<T> = std::result::Result<T, RegistryError>;
