//! Application state for API handlers

use brick_control::{Configurator, PageAssembler, ReloadHandler};
use brick_store::PanelStateManager;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Reload protocol
    pub reload: ReloadHandler,

    /// Page views
    pub pages: PageAssembler,

    /// Placement and config item administration
    pub config: Configurator,

    /// Brick states
    pub states: Arc<PanelStateManager>,

    /// Daemon version
    pub version: String,

    /// Daemon start time
    pub started_at: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    /// Create new application state
    pub fn new(
        reload: ReloadHandler,
        pages: PageAssembler,
        config: Configurator,
        states: Arc<PanelStateManager>,
    ) -> Self {
        Self {
            reload,
            pages,
            config,
            states,
            version: env!("CARGO_PKG_VERSION").to_string(),
            started_at: chrono::Utc::now(),
        }
    }

    /// Get uptime as a human-readable string
    pub fn uptime(&self) -> String {
        let secs = (chrono::Utc::now() - self.started_at).num_seconds();

        if secs < 60 {
            format!("{}s", secs)
        } else if secs < 3600 {
            format!("{}m {}s", secs / 60, secs % 60)
        } else {
            format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
        }
    }
}
