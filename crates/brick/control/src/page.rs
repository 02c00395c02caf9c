//! Page assembly
//!
//! A page view resolves the placement for the user, materializes and renders
//! the bricks once, and hands the client what it needs for later partial
//! reloads: the page's brick ids and their dependency map.

use crate::context::RequestContext;
use crate::dependency::{DependencyMap, DependencyResolver};
use crate::error::{ControlError, Result};
use crate::rendering::{PanelRenderer, RenderPass, RenderedPanel};
use brick_registry::Surface;
use brick_store::PlacementService;
use brick_types::{PanelId, RecordId, Zone};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Rendered detail page of one record
#[derive(Debug, Clone, Serialize)]
pub struct DetailPage {
    pub record_id: RecordId,
    pub zones: BTreeMap<Zone, Vec<RenderedPanel>>,
    pub panel_ids: Vec<PanelId>,
    pub dependencies: DependencyMap,
}

/// Rendered home page or my-page
#[derive(Debug, Clone, Serialize)]
pub struct PanelPage {
    pub panels: Vec<RenderedPanel>,
    pub panel_ids: Vec<PanelId>,
    pub dependencies: DependencyMap,
}

/// Builds full pages
#[derive(Clone)]
pub struct PageAssembler {
    placements: Arc<PlacementService>,
    renderer: PanelRenderer,
    resolver: DependencyResolver,
}

impl PageAssembler {
    pub fn new(placements: Arc<PlacementService>, renderer: PanelRenderer) -> Self {
        Self {
            placements,
            renderer,
            resolver: DependencyResolver::new(),
        }
    }

    #[instrument(skip(self, ctx), fields(request_id = %ctx.request_id, record_id = %record_id))]
    pub async fn detail_page(&self, ctx: &RequestContext, record_id: &RecordId) -> Result<DetailPage> {
        let factory = self.renderer.factory();
        let record = factory
            .records()
            .get(record_id)
            .await?
            .ok_or_else(|| ControlError::RecordNotFound(record_id.clone()))?;
        if !factory.permissions().can_view(&ctx.user, &record)? {
            return Err(ControlError::forbidden(format!("cannot view {}", record.id)));
        }

        let resolution = self
            .placements
            .placements_for(&record.record_type, &ctx.audience())
            .await?;

        let mut zone_ids: Vec<(Zone, Vec<PanelId>)> = Zone::ALL
            .iter()
            .map(|zone| (*zone, resolution.zone(*zone)))
            .collect();
        // Without a configured hat, the main hat of the record type is shown.
        if let Some((_, hats)) = zone_ids.iter_mut().find(|(zone, _)| *zone == Zone::Hat) {
            if hats.is_empty() {
                hats.push(PanelId::new(PanelId::GENERIC_HAT));
            }
        }
        let panel_ids: Vec<PanelId> = zone_ids.iter().flat_map(|(_, ids)| ids.iter().cloned()).collect();
        debug!(record_type = %record.record_type, bricks = panel_ids.len(), "Assembling detail page");

        let (panels, rendered) = self
            .renderer
            .render(RenderPass {
                ids: &panel_ids,
                record: Some(&record),
                surface: Surface::Detail,
                user: &ctx.user,
                reloading: &HashMap::new(),
                page_panel_ids: &panel_ids,
            })
            .await;
        let dependencies = self
            .resolver
            .resolve(panels.iter().filter(|p| !p.is_unknown()).map(|p| p.descriptor()));

        let mut by_id: HashMap<PanelId, RenderedPanel> =
            rendered.into_iter().map(|r| (r.id.clone(), r)).collect();
        let zones = zone_ids
            .into_iter()
            .map(|(zone, ids)| {
                let rendered = ids.iter().filter_map(|id| by_id.remove(id)).collect();
                (zone, rendered)
            })
            .collect();

        Ok(DetailPage {
            record_id: record.id,
            zones,
            panel_ids,
            dependencies,
        })
    }

    #[instrument(skip(self, ctx), fields(request_id = %ctx.request_id))]
    pub async fn home_page(&self, ctx: &RequestContext) -> Result<PanelPage> {
        let resolution = self.placements.home_placements(&ctx.audience()).await?;
        Ok(self
            .panel_page(ctx, resolution.panel_ids, Surface::Home)
            .await)
    }

    #[instrument(skip(self, ctx), fields(request_id = %ctx.request_id))]
    pub async fn my_page(&self, ctx: &RequestContext) -> Result<PanelPage> {
        let resolution = self.placements.mypage_placements(&ctx.user.id).await?;
        Ok(self
            .panel_page(ctx, resolution.panel_ids, Surface::MyPage)
            .await)
    }

    async fn panel_page(&self, ctx: &RequestContext, panel_ids: Vec<PanelId>, surface: Surface) -> PanelPage {
        let (panels, rendered) = self
            .renderer
            .render(RenderPass {
                ids: &panel_ids,
                record: None,
                surface,
                user: &ctx.user,
                reloading: &HashMap::new(),
                page_panel_ids: &panel_ids,
            })
            .await;

        let dependencies = self
            .resolver
            .resolve(panels.iter().filter(|p| !p.is_unknown()).map(|p| p.descriptor()));
        PanelPage {
            panels: rendered,
            panel_ids,
            dependencies,
        }
    }
}
