//! Request context for brick operations
//!
//! The request context carries who is asking and a request id for tracing.
//! It is built per request and passed by parameter, never stored.

use brick_types::{Audience, User};
use uuid::Uuid;

/// Context of one brick request
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Unique request ID for tracing
    pub request_id: Uuid,
    /// Requesting user, as resolved by the host's authentication
    pub user: User,
    /// Request timestamp
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Optional correlation ID for distributed tracing
    pub correlation_id: Option<String>,
}

impl RequestContext {
    pub fn new(user: User) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            user,
            timestamp: chrono::Utc::now(),
            correlation_id: None,
        }
    }

    /// Set a correlation ID for distributed tracing
    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    /// Placement layer the user belongs to.
    pub fn audience(&self) -> Audience {
        Audience::for_user(&self.user)
    }

    pub fn is_superuser(&self) -> bool {
        self.user.is_superuser
    }
}
