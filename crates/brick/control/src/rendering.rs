//! Rendering of a set of bricks
//!
//! Shared by page assembly and reloads: materialize the ids, load the
//! users' states in one query, then render each brick with its own context
//! copy. A brick that fails is logged and left out; the others still render.

use brick_registry::{
    Panel, PanelFactory, ReloadingInfo, ReloadingInfoError, RenderContext, RenderServices,
    Surface,
};
use brick_store::PanelStateManager;
use brick_types::{PanelId, PanelState, Record, StateFields, User};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// One rendered brick
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedPanel {
    pub id: PanelId,
    pub html: String,
}

/// Materialize-and-render pipeline
#[derive(Clone)]
pub struct PanelRenderer {
    factory: PanelFactory,
    states: Arc<PanelStateManager>,
    services: RenderServices,
    persist_reloading_info: bool,
}

/// Inputs of one rendering pass
pub struct RenderPass<'a> {
    pub ids: &'a [PanelId],
    pub record: Option<&'a Record>,
    pub surface: Surface,
    pub user: &'a User,
    /// Client-supplied reloading info per brick
    pub reloading: &'a HashMap<PanelId, Value>,
    /// Ids of every brick on the page
    pub page_panel_ids: &'a [PanelId],
}

impl PanelRenderer {
    pub fn new(factory: PanelFactory, states: Arc<PanelStateManager>, services: RenderServices) -> Self {
        Self {
            factory,
            states,
            services,
            persist_reloading_info: true,
        }
    }

    /// Whether valid client reloading info is saved into the brick state.
    pub fn with_persisted_reloading_info(mut self, persist: bool) -> Self {
        self.persist_reloading_info = persist;
        self
    }

    pub fn factory(&self) -> &PanelFactory {
        &self.factory
    }

    pub fn states(&self) -> &Arc<PanelStateManager> {
        &self.states
    }

    /// Materialize then render; returns the bricks with their fragments.
    pub async fn render(&self, pass: RenderPass<'_>) -> (Vec<Panel>, Vec<RenderedPanel>) {
        let panels = self
            .factory
            .materialize(pass.ids, pass.record, pass.user)
            .await;
        let rendered = self.render_panels(&panels, &pass).await;
        (panels, rendered)
    }

    async fn render_panels(&self, panels: &[Panel], pass: &RenderPass<'_>) -> Vec<RenderedPanel> {
        let ids: Vec<PanelId> = panels.iter().map(|p| p.id().clone()).collect();
        let mut states = match self.states.get_many(&ids, &pass.user.id).await {
            Ok(states) => states,
            Err(e) => {
                warn!(error = %e, "Failed to load brick states, using defaults");
                HashMap::new()
            }
        };

        let mut base = RenderContext::new(pass.surface, pass.user.clone())
            .with_page_panel_ids(pass.page_panel_ids.to_vec());
        base.record = pass.record.cloned();

        let mut rendered = Vec::with_capacity(panels.len());
        for panel in panels {
            if panel.is_unknown() {
                continue;
            }
            if !panel.supports(pass.surface) {
                warn!(panel_id = %panel.id(), surface = pass.surface.as_str(), "Brick cannot be displayed here, skipped");
                continue;
            }

            let state = states
                .remove(panel.id())
                .unwrap_or_else(|| PanelState::new(pass.user.id.clone(), panel.id().clone()));
            let reloading = self
                .reloading_info(panel, &state, pass.reloading.get(panel.id()))
                .await;
            let ctx = base.for_panel(Some(state), reloading);

            match panel.render(&ctx, &self.services).await {
                Ok(Some(html)) => rendered.push(RenderedPanel {
                    id: panel.id().clone(),
                    html,
                }),
                Ok(None) => {
                    warn!(panel_id = %panel.id(), "Brick has no template for this surface, skipped");
                }
                Err(e) => {
                    warn!(panel_id = %panel.id(), error = %e, "Brick rendering failed, skipped");
                }
            }
        }

        rendered
    }

    /// Client info when valid, else what the state remembers.
    async fn reloading_info(
        &self,
        panel: &Panel,
        state: &PanelState,
        supplied: Option<&Value>,
    ) -> ReloadingInfo {
        let stored = || ReloadingInfo::from_extra_data(&state.extra_data);

        let Some(value) = supplied else {
            return stored();
        };

        match panel.parse_reloading_info(value) {
            Ok(info) => {
                if self.persist_reloading_info && info.to_extra_data() != state.extra_data {
                    self.states
                        .set_fields(
                            &state.user_id,
                            panel.id(),
                            &StateFields::extra_data(info.to_extra_data()),
                        )
                        .await;
                }
                info
            }
            Err(ReloadingInfoError::NotReloadable(kind)) => {
                debug!(panel_id = %panel.id(), kind = %kind, "Ignoring reloading info");
                stored()
            }
            Err(e) => {
                warn!(panel_id = %panel.id(), error = %e, "Invalid reloading info, using stored state");
                stored()
            }
        }
    }
}
