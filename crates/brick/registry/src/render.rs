//! Brick rendering
//!
//! Every brick renders to an HTML fragment through a host-provided
//! [`TemplateRenderer`]. Each brick of a page gets its own copy of the
//! [`RenderContext`]; nothing one brick writes is visible to the next.

use crate::error::{RegistryError, Result};
use crate::panel::{
    CustomPanel, InstancePanel, ListSource, PaginatedPanel, Panel, PanelBody, QuerysetPanel,
    RelationPanel,
};
use crate::reloading::ReloadingInfo;
use crate::source::{OrderBy, RecordSource, Window};
use brick_types::{PanelId, PanelState, Record, RecordId, Relation, RelationTypeId, User};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Template of Forbidden placeholders
pub const FORBIDDEN_TEMPLATE: &str = "bricks/forbidden.html";
/// Template of Void placeholders
pub const VOID_TEMPLATE: &str = "bricks/void.html";

/// Page kind a brick is rendered on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Surface {
    Detail,
    Home,
    MyPage,
}

impl Surface {
    pub fn as_str(&self) -> &'static str {
        match self {
            Surface::Detail => "detail",
            Surface::Home => "home",
            Surface::MyPage => "mypage",
        }
    }
}

/// Host-provided template engine
pub trait TemplateRenderer: Send + Sync {
    fn render(&self, template: &str, context: &Value) -> Result<String>;
}

/// Renders the template name and context as JSON. Used by tests and as a
/// debugging fallback.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonRenderer;

impl TemplateRenderer for JsonRenderer {
    fn render(&self, template: &str, context: &Value) -> Result<String> {
        Ok(json!({ "template": template, "context": context }).to_string())
    }
}

/// Collaborators needed while rendering
#[derive(Clone)]
pub struct RenderServices {
    pub renderer: Arc<dyn TemplateRenderer>,
    pub records: Arc<dyn RecordSource>,
}

impl RenderServices {
    pub fn new(renderer: Arc<dyn TemplateRenderer>, records: Arc<dyn RecordSource>) -> Self {
        Self { renderer, records }
    }
}

/// Per-brick render context
#[derive(Debug, Clone)]
pub struct RenderContext {
    pub surface: Surface,
    pub user: User,
    pub record: Option<Record>,
    pub state: Option<PanelState>,
    pub reloading: ReloadingInfo,
    /// Ids of every brick on the page, for later reloads
    pub page_panel_ids: Vec<PanelId>,
    pub extra: Map<String, Value>,
}

impl RenderContext {
    pub fn new(surface: Surface, user: User) -> Self {
        Self {
            surface,
            user,
            record: None,
            state: None,
            reloading: ReloadingInfo::default(),
            page_panel_ids: Vec::new(),
            extra: Map::new(),
        }
    }

    pub fn with_record(mut self, record: Record) -> Self {
        self.record = Some(record);
        self
    }

    pub fn with_page_panel_ids(mut self, ids: Vec<PanelId>) -> Self {
        self.page_panel_ids = ids;
        self
    }

    /// Independent copy for one brick.
    pub fn for_panel(&self, state: Option<PanelState>, reloading: ReloadingInfo) -> Self {
        let mut ctx = self.clone();
        ctx.state = state;
        ctx.reloading = reloading;
        ctx
    }

    fn show_empty_fields(&self) -> bool {
        self.state.as_ref().map_or(true, |s| s.show_empty_fields)
    }

    fn base(&self, panel: &Panel) -> Map<String, Value> {
        let descriptor = panel.descriptor();
        let (is_open, show_empty_fields) = self
            .state
            .as_ref()
            .map_or((true, true), |s| (s.is_open, s.show_empty_fields));

        let mut ctx = self.extra.clone();
        ctx.insert(
            "brick".into(),
            json!({
                "id": descriptor.id,
                "kind": descriptor.kind,
                "verbose_name": descriptor.verbose_name,
                "read_only": descriptor.read_only,
                "reloading_info": self.reloading.to_extra_data(),
            }),
        );
        ctx.insert("surface".into(), json!(self.surface.as_str()));
        ctx.insert("user".into(), self.user.to_context());
        ctx.insert(
            "record".into(),
            self.record.as_ref().map_or(Value::Null, Record::to_context),
        );
        ctx.insert(
            "state".into(),
            json!({ "is_open": is_open, "show_empty_fields": show_empty_fields }),
        );
        ctx.insert("page_panel_ids".into(), json!(self.page_panel_ids));
        ctx
    }
}

/// Page of a list brick. Out of range requests are clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageWindow {
    pub number: usize,
    pub count: usize,
    pub size: usize,
    pub total: usize,
}

impl PageWindow {
    pub fn new(requested: Option<usize>, total: usize, size: usize) -> Self {
        let size = size.max(1);
        let count = total.div_ceil(size).max(1);
        let number = requested.unwrap_or(1).clamp(1, count);
        Self {
            number,
            count,
            size,
            total,
        }
    }

    pub fn window(&self) -> Window {
        Window {
            offset: (self.number - 1) * self.size,
            limit: self.size,
        }
    }

    fn slice<T: Clone>(&self, items: &[T]) -> Vec<T> {
        let Window { offset, limit } = self.window();
        items.iter().skip(offset).take(limit).cloned().collect()
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}

fn host_record<'a>(panel: &Panel, ctx: &'a RenderContext) -> Result<&'a Record> {
    ctx.record
        .as_ref()
        .ok_or_else(|| RegistryError::Render(format!("{} requires a host record", panel.id())))
}

/// Host relations of the requested types, after include/exclude filters.
async fn filtered_relations(
    records: &dyn RecordSource,
    host: &RecordId,
    declared: &[RelationTypeId],
    info: &ReloadingInfo,
) -> Result<Vec<Relation>> {
    let mut types: Vec<RelationTypeId> = declared.to_vec();
    if !info.include.is_empty() {
        types = if types.is_empty() {
            info.include.clone()
        } else {
            types
                .into_iter()
                .filter(|t| info.include.contains(t))
                .collect()
        };
        if types.is_empty() {
            return Ok(Vec::new());
        }
    }

    let relations = records.relations(host, &types).await?;
    Ok(relations
        .into_iter()
        .filter(|rel| !info.exclude.contains(&rel.relation_type))
        .collect())
}

/// Objects of a page of relations, fetched in one call.
async fn relation_objects(
    records: &dyn RecordSource,
    relations: &[Relation],
) -> Result<HashMap<RecordId, Record>> {
    let ids: Vec<RecordId> = relations.iter().map(|r| r.object.clone()).collect();
    Ok(records
        .bulk_fetch(&ids)
        .await?
        .into_iter()
        .map(|r| (r.id.clone(), r))
        .collect())
}

impl Panel {
    /// Detail page hook
    pub async fn render_for_detail(
        &self,
        ctx: &RenderContext,
        services: &RenderServices,
    ) -> Result<Option<String>> {
        let mut ctx = ctx.clone();
        ctx.surface = Surface::Detail;
        self.render(&ctx, services).await
    }

    /// Home and my-page hook
    pub async fn render_for_home(
        &self,
        ctx: &RenderContext,
        services: &RenderServices,
    ) -> Result<Option<String>> {
        let mut ctx = ctx.clone();
        if ctx.surface == Surface::Detail {
            ctx.surface = Surface::Home;
        }
        self.render(&ctx, services).await
    }

    /// Render on the context's surface.
    ///
    /// `Ok(None)` means the brick has no hook for that surface.
    pub async fn render(
        &self,
        ctx: &RenderContext,
        services: &RenderServices,
    ) -> Result<Option<String>> {
        if !self.supports(ctx.surface) {
            debug!(panel_id = %self.id(), surface = ctx.surface.as_str(), "Brick has no hook for surface");
            return Ok(None);
        }

        let mut context = ctx.base(self);
        let template = match self.body() {
            PanelBody::Simple(p) => p.templates.for_surface(ctx.surface),
            PanelBody::Paginated(p) => {
                self.paginated_context(p, ctx, services, &mut context).await?;
                p.templates.for_surface(ctx.surface)
            }
            PanelBody::Queryset(q) => {
                self.queryset_context(q, ctx, services, &mut context).await?;
                q.templates.for_surface(ctx.surface)
            }
            PanelBody::Instance(i) => {
                Self::instance_context(i, &mut context);
                i.class.templates.for_surface(ctx.surface)
            }
            PanelBody::Relation(r) => {
                self.relation_context(r, ctx, services, &mut context).await?;
                Some(RelationPanel::TEMPLATE)
            }
            PanelBody::Custom(c) => {
                self.custom_context(c, ctx, &mut context)?;
                Some(CustomPanel::TEMPLATE)
            }
            PanelBody::Forbidden { reason } => {
                context.insert("reason".into(), json!(reason));
                Some(FORBIDDEN_TEMPLATE)
            }
            PanelBody::Void(reason) => {
                context.insert("reason".into(), json!(reason.as_str()));
                Some(VOID_TEMPLATE)
            }
        };

        let Some(template) = template else {
            return Ok(None);
        };
        services
            .renderer
            .render(template, &Value::Object(context))
            .map(Some)
    }

    async fn paginated_context(
        &self,
        panel: &PaginatedPanel,
        ctx: &RenderContext,
        services: &RenderServices,
        context: &mut Map<String, Value>,
    ) -> Result<()> {
        let records = services.records.as_ref();
        let (page, items) = match &panel.source {
            ListSource::Relations { relation_types } => {
                let host = host_record(self, ctx)?;
                let relations =
                    filtered_relations(records, &host.id, relation_types, &ctx.reloading).await?;
                let page = PageWindow::new(ctx.reloading.page, relations.len(), panel.page_size);
                let shown = page.slice(&relations);
                let objects = relation_objects(records, &shown).await?;

                let items: Vec<Value> = shown
                    .iter()
                    .map(|rel| {
                        json!({
                            "relation_type": rel.relation_type,
                            "object": objects.get(&rel.object).map_or(Value::Null, Record::to_context),
                        })
                    })
                    .collect();
                (page, items)
            }
            ListSource::Records(query) => {
                let total = records.count(query).await?;
                let page = PageWindow::new(ctx.reloading.page, total, panel.page_size);
                let items = records
                    .filter(query, page.window())
                    .await?
                    .iter()
                    .map(Record::to_context)
                    .collect();
                (page, items)
            }
        };

        context.insert("page".into(), json!(page));
        context.insert("items".into(), Value::Array(items));
        Ok(())
    }

    async fn queryset_context(
        &self,
        panel: &QuerysetPanel,
        ctx: &RenderContext,
        services: &RenderServices,
        context: &mut Map<String, Value>,
    ) -> Result<()> {
        let order = ctx
            .reloading
            .order_by
            .as_deref()
            .and_then(OrderBy::parse)
            .filter(|o| panel.is_sortable(o))
            .or_else(|| panel.default_order.clone());

        let mut query = panel.query.clone();
        if let Some(order) = &order {
            query.order_by = vec![order.clone()];
        }

        let total = services.records.count(&query).await?;
        let page = PageWindow::new(ctx.reloading.page, total, panel.page_size);
        let items: Vec<Value> = services
            .records
            .filter(&query, page.window())
            .await?
            .iter()
            .map(Record::to_context)
            .collect();

        context.insert("page".into(), json!(page));
        context.insert("items".into(), Value::Array(items));
        context.insert(
            "order_by".into(),
            order.map_or(Value::Null, |o| json!(o.to_string())),
        );
        context.insert("sortable".into(), json!(panel.sortable));
        Ok(())
    }

    fn instance_context(panel: &InstancePanel, context: &mut Map<String, Value>) {
        context.insert(
            "item".into(),
            json!({
                "id": panel.item.id,
                "class": panel.class.id,
                "extra_data": panel.item.extra_data,
            }),
        );
        context.insert("anchor".into(), panel.anchor.to_context());
    }

    async fn relation_context(
        &self,
        panel: &RelationPanel,
        ctx: &RenderContext,
        services: &RenderServices,
        context: &mut Map<String, Value>,
    ) -> Result<()> {
        let host = host_record(self, ctx)?;
        let records = services.records.as_ref();
        let relations = records
            .relations(&host.id, std::slice::from_ref(&panel.item.relation_type))
            .await?;
        let page = PageWindow::new(ctx.reloading.page, relations.len(), panel.page_size);
        let shown = page.slice(&relations);
        let objects = relation_objects(records, &shown).await?;

        let items: Vec<Value> = shown
            .iter()
            .filter_map(|rel| objects.get(&rel.object))
            .map(|object| {
                let cells: Vec<Value> = panel
                    .item
                    .cells
                    .get(&object.record_type)
                    .map(|cells| {
                        cells
                            .iter()
                            .map(|cell| json!({ "name": cell, "value": object.field(cell) }))
                            .collect()
                    })
                    .unwrap_or_default();
                json!({ "object": object.to_context(), "cells": cells })
            })
            .collect();

        context.insert("relation_type".into(), json!(panel.item.relation_type));
        context.insert("page".into(), json!(page));
        context.insert("items".into(), Value::Array(items));
        Ok(())
    }

    fn custom_context(
        &self,
        panel: &CustomPanel,
        ctx: &RenderContext,
        context: &mut Map<String, Value>,
    ) -> Result<()> {
        let host = host_record(self, ctx)?;
        if host.record_type != panel.item.record_type {
            return Err(RegistryError::Render(format!(
                "{} shows fields of {}, not {}",
                self.id(),
                panel.item.record_type,
                host.record_type
            )));
        }

        let show_empty = ctx.show_empty_fields();
        let fields: Vec<Value> = panel
            .item
            .cells
            .iter()
            .filter_map(|cell| {
                let value = host.field(cell);
                if !show_empty && is_empty_value(value) {
                    None
                } else {
                    Some(json!({ "name": cell, "value": value }))
                }
            })
            .collect();

        context.insert("name".into(), json!(panel.item.name));
        context.insert("fields".into(), Value::Array(fields));
        Ok(())
    }
}
