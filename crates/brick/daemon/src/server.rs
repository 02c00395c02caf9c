//! Server setup and lifecycle management

use crate::api::create_router;
use crate::api::rest::state::AppState;
use crate::catalog;
use crate::config::DaemonConfig;
use crate::error::{DaemonError, DaemonResult};
use axum::Router;
use brick_control::{Configurator, PageAssembler, PanelRenderer, ReloadConfig, ReloadHandler};
use brick_registry::{
    AllowAllPermissions, InMemoryRecordSource, PanelFactory, PanelRegistry, PermissionChecker,
    RecordSource, RenderServices, TemplateRenderer,
};
use brick_store::{
    ConfigItemService, InMemoryStorage, PanelStateManager, PlacementService, StateManagerConfig,
};
use std::sync::Arc;
use tokio::net::TcpListener;

/// Collaborators supplied by the host
pub struct Collaborators {
    pub registry: PanelRegistry,
    pub records: Arc<dyn RecordSource>,
    pub permissions: Arc<dyn PermissionChecker>,
    pub templates: Arc<dyn TemplateRenderer>,
}

impl Collaborators {
    /// Demonstration catalog over seeded in-memory records.
    pub async fn demo() -> DaemonResult<Self> {
        let records = InMemoryRecordSource::new();
        catalog::seed_records(&records).await;

        Ok(Self {
            registry: catalog::demo_registry()?,
            records: Arc::new(records),
            permissions: Arc::new(AllowAllPermissions),
            templates: Arc::new(catalog::demo_templates()),
        })
    }

    /// Empty catalog, for hosts that only use configuration endpoints.
    pub fn empty() -> Self {
        Self {
            registry: PanelRegistry::new(),
            records: Arc::new(InMemoryRecordSource::new()),
            permissions: Arc::new(AllowAllPermissions),
            templates: Arc::new(catalog::demo_templates()),
        }
    }
}

/// brickd server
pub struct Server {
    config: DaemonConfig,
    state: AppState,
}

impl Server {
    /// Create a new server with the given configuration
    pub async fn new(config: DaemonConfig) -> DaemonResult<Self> {
        let collaborators = if config.bricks.demo_catalog {
            Collaborators::demo().await?
        } else {
            Collaborators::empty()
        };
        Ok(Self::with_collaborators(config, collaborators))
    }

    /// Create a server over host-supplied collaborators
    pub fn with_collaborators(config: DaemonConfig, collaborators: Collaborators) -> Self {
        let storage = Arc::new(InMemoryStorage::new());

        let factory = PanelFactory::new(
            Arc::new(collaborators.registry),
            storage.clone(),
            collaborators.records.clone(),
            collaborators.permissions,
        )
        .with_page_size(config.bricks.default_page_size);

        let placements = Arc::new(PlacementService::new(storage.clone()));
        let items = Arc::new(ConfigItemService::new(storage.clone(), storage.clone()));
        let states = Arc::new(PanelStateManager::new(
            storage,
            StateManagerConfig {
                max_upsert_retries: config.state.max_upsert_retries,
            },
        ));

        let renderer = PanelRenderer::new(
            factory.clone(),
            states.clone(),
            RenderServices::new(collaborators.templates, collaborators.records),
        );
        let reload = ReloadHandler::new(
            renderer.clone(),
            ReloadConfig {
                persist_reloading_info: config.bricks.persist_reloading_info,
            },
        );
        let pages = PageAssembler::new(placements.clone(), renderer);
        let configurator = Configurator::new(placements, items, factory);

        let state = AppState::new(reload, pages, configurator, states);
        Self { config, state }
    }

    /// The HTTP application
    pub fn router(&self) -> Router {
        create_router(self.state.clone(), &self.config.server)
    }

    /// Run the server
    pub async fn run(self) -> DaemonResult<()> {
        let addr = self.config.server.listen_addr;
        let app = self.router();

        let listener = TcpListener::bind(addr).await?;
        tracing::info!("Brick daemon listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| DaemonError::Server(e.to_string()))?;

        tracing::info!("Brick daemon shutting down");
        Ok(())
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }
}
