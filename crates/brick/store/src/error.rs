//! Store error types

use brick_types::{Audience, PanelId, RecordType, RelationTypeId, UserId};
use thiserror::Error;

/// Why a configuration change was refused
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictReason {
    /// The global default layer backs every resolution and cannot go away
    DefaultLayerProtected,

    /// A brick appears twice in one layer
    DuplicatePlacement {
        panel_id: PanelId,
        record_type: Option<RecordType>,
        audience: Audience,
    },

    /// A config item is still referenced by placement rows
    ItemInUse { panel_id: PanelId, references: usize },

    /// Only one relation config item may exist per relation type
    DuplicateRelationItem { relation_type: RelationTypeId },
}

impl std::fmt::Display for ConflictReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConflictReason::DefaultLayerProtected => {
                write!(f, "the default configuration cannot be deleted")
            }
            ConflictReason::DuplicatePlacement {
                panel_id,
                record_type,
                audience,
            } => match record_type {
                Some(rt) => write!(
                    f,
                    "brick {} is used twice in the configuration of {} for {}",
                    panel_id, rt, audience
                ),
                None => write!(
                    f,
                    "brick {} is used twice in the default configuration for {}",
                    panel_id, audience
                ),
            },
            ConflictReason::ItemInUse {
                panel_id,
                references,
            } => write!(
                f,
                "brick {} is still placed {} time(s); remove it from the configuration first",
                panel_id, references
            ),
            ConflictReason::DuplicateRelationItem { relation_type } => write!(
                f,
                "a brick for relation type {} already exists",
                relation_type
            ),
        }
    }
}

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(ConflictReason),

    /// Raised by backends when a second state row is inserted for the same
    /// (user, brick) pair
    #[error("Unique constraint violated for state of brick {panel_id} (user {user_id})")]
    UniqueViolation { user_id: UserId, panel_id: PanelId },

    #[error("Storage error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn conflict_reason(&self) -> Option<&ConflictReason> {
        match self {
            StoreError::Conflict(reason) => Some(reason),
            _ => None,
        }
    }
}

/// Result type for store operations
pub type Result<T> = std::result::Result<T, StoreError>;
