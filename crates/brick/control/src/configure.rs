//! Placement and config item administration
//!
//! Every write goes through form validation first, then the store. Detail
//! and home layers and config items are reserved to superusers; a user may
//! configure their own my-page.

use crate::context::RequestContext;
use crate::error::{ControlError, FieldErrorCode, FieldErrors, Result};
use crate::form::{parse_panel_list, parse_zone_layout, PlacementChoices};
use brick_registry::PanelFactory;
use brick_store::{ConfigItemService, LayerKey, PlacementService};
use brick_types::{
    Audience, CustomFieldConfigItem, InstanceClassId, InstanceConfigItem, PanelId, RecordId,
    RecordType, RelationConfigItem, RelationTypeId, ZoneLayout,
};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Detail layout as seen by a configuration screen
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailLayoutView {
    pub layout: ZoneLayout,
    /// Whether the requested layer has rows of its own; otherwise the
    /// layout is the one it currently falls back to
    pub configured: bool,
}

/// Home or my-page list as seen by a configuration screen
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PanelListView {
    pub panel_ids: Vec<PanelId>,
    pub configured: bool,
}

/// New instance brick
#[derive(Debug, Clone)]
pub struct NewInstanceItem {
    pub class_id: InstanceClassId,
    pub record_id: RecordId,
    pub extra_data: Map<String, Value>,
}

/// New relation brick
#[derive(Debug, Clone)]
pub struct NewRelationItem {
    pub relation_type: RelationTypeId,
    pub cells: BTreeMap<RecordType, Vec<String>>,
}

/// New custom field group brick
#[derive(Debug, Clone)]
pub struct NewCustomItem {
    pub record_type: RecordType,
    pub name: String,
    pub cells: Vec<String>,
}

/// Administration entry point
#[derive(Clone)]
pub struct Configurator {
    placements: Arc<PlacementService>,
    items: Arc<ConfigItemService>,
    factory: PanelFactory,
}

fn require_superuser(ctx: &RequestContext) -> Result<()> {
    if ctx.is_superuser() {
        Ok(())
    } else {
        Err(ControlError::forbidden("only superusers can configure bricks"))
    }
}

impl Configurator {
    pub fn new(
        placements: Arc<PlacementService>,
        items: Arc<ConfigItemService>,
        factory: PanelFactory,
    ) -> Self {
        Self {
            placements,
            items,
            factory,
        }
    }

    /// Bricks an administrator may place on detail views of a record type,
    /// or of every type when `record_type` is None.
    pub async fn detail_choices(&self, record_type: Option<&RecordType>) -> Result<PlacementChoices> {
        let registry = self.factory.registry();
        let (body, hats): (Vec<PanelId>, Vec<PanelId>) = match record_type {
            Some(rt) => (
                self.factory
                    .resolve_for_record_type(rt)
                    .await?
                    .into_iter()
                    .map(|d| d.id)
                    .collect(),
                registry
                    .resolve_hat_panels(rt)
                    .into_iter()
                    .map(|p| p.id().clone())
                    .collect(),
            ),
            None => (
                self.factory
                    .resolve_for_any_record_type()
                    .await?
                    .into_iter()
                    .map(|d| d.id)
                    .collect(),
                vec![PanelId::new(PanelId::GENERIC_HAT)],
            ),
        };
        Ok(PlacementChoices::new(body, hats))
    }

    /// Bricks an administrator may place on home and my-page.
    pub async fn home_choices(&self) -> Result<BTreeSet<PanelId>> {
        Ok(self
            .factory
            .resolve_for_home()
            .await?
            .into_iter()
            .map(|d| d.id)
            .collect())
    }

    #[instrument(skip(self, ctx), fields(request_id = %ctx.request_id))]
    pub async fn detail_layout(
        &self,
        ctx: &RequestContext,
        record_type: Option<&RecordType>,
        audience: &Audience,
    ) -> Result<DetailLayoutView> {
        require_superuser(ctx)?;

        let key = LayerKey::new(record_type.cloned(), audience.clone());
        let rules = self.placements.layer(&key).await?;
        if !rules.is_empty() {
            return Ok(DetailLayoutView {
                layout: ZoneLayout::from_rules(&rules),
                configured: true,
            });
        }

        let layout = match record_type {
            Some(rt) => self.placements.placements_for(rt, audience).await?.layout(),
            None => ZoneLayout::from_rules(&self.placements.layer(&LayerKey::global_default()).await?),
        };
        Ok(DetailLayoutView {
            layout,
            configured: false,
        })
    }

    /// Validate and store a detail layer.
    ///
    /// Configuring a record type for a role or superusers first gives the
    /// type its own default layer, so that other audiences keep their
    /// current layout.
    #[instrument(skip(self, ctx, input), fields(request_id = %ctx.request_id))]
    pub async fn set_detail_layout(
        &self,
        ctx: &RequestContext,
        record_type: Option<&RecordType>,
        audience: &Audience,
        input: &Value,
    ) -> Result<ZoneLayout> {
        require_superuser(ctx)?;

        let choices = self.detail_choices(record_type).await?;
        let layout = parse_zone_layout(input, &choices).map_err(ControlError::Validation)?;

        if let Some(rt) = record_type {
            if !audience.is_default() && self.placements.ensure_record_type_layer(rt).await? {
                info!(record_type = %rt, "Created default layer of record type");
            }
        }

        self.placements
            .set_detail_layer(record_type, audience, &layout)
            .await?;
        Ok(layout)
    }

    #[instrument(skip(self, ctx), fields(request_id = %ctx.request_id))]
    pub async fn delete_detail_layout(
        &self,
        ctx: &RequestContext,
        record_type: Option<&RecordType>,
        audience: &Audience,
    ) -> Result<usize> {
        require_superuser(ctx)?;
        Ok(self
            .placements
            .delete_detail_layer(record_type, audience)
            .await?)
    }

    pub async fn home_layout(&self, ctx: &RequestContext, audience: &Audience) -> Result<PanelListView> {
        require_superuser(ctx)?;
        let resolution = self.placements.home_placements(audience).await?;
        Ok(PanelListView {
            configured: resolution.specific || audience.is_default(),
            panel_ids: resolution.panel_ids,
        })
    }

    #[instrument(skip(self, ctx, input), fields(request_id = %ctx.request_id))]
    pub async fn set_home_layout(
        &self,
        ctx: &RequestContext,
        audience: &Audience,
        input: &Value,
    ) -> Result<Vec<PanelId>> {
        require_superuser(ctx)?;

        let choices = self.home_choices().await?;
        let ids = parse_panel_list(input, &choices).map_err(ControlError::Validation)?;
        self.placements.set_home_layer(audience, &ids).await?;
        Ok(ids)
    }

    pub async fn delete_home_layout(&self, ctx: &RequestContext, audience: &Audience) -> Result<usize> {
        require_superuser(ctx)?;
        Ok(self.placements.delete_home_layer(audience).await?)
    }

    /// The requesting user's my-page list.
    pub async fn mypage_layout(&self, ctx: &RequestContext) -> Result<PanelListView> {
        let resolution = self.placements.mypage_placements(&ctx.user.id).await?;
        Ok(PanelListView {
            panel_ids: resolution.panel_ids,
            configured: resolution.specific,
        })
    }

    /// Store the requesting user's my-page, or the default one given to
    /// users without their own (superusers only).
    #[instrument(skip(self, ctx, input), fields(request_id = %ctx.request_id))]
    pub async fn set_mypage_layout(
        &self,
        ctx: &RequestContext,
        default_layer: bool,
        input: &Value,
    ) -> Result<Vec<PanelId>> {
        if default_layer {
            require_superuser(ctx)?;
        }

        let choices = self.home_choices().await?;
        let ids = parse_panel_list(input, &choices).map_err(ControlError::Validation)?;
        let user = (!default_layer).then_some(&ctx.user.id);
        self.placements.set_mypage_layer(user, &ids).await?;
        Ok(ids)
    }

    #[instrument(skip(self, ctx, item), fields(request_id = %ctx.request_id, class_id = %item.class_id))]
    pub async fn create_instance_item(&self, ctx: &RequestContext, item: NewInstanceItem) -> Result<PanelId> {
        require_superuser(ctx)?;

        let mut errors = FieldErrors::new();
        if self.factory.registry().instance_class(&item.class_id).is_none() {
            errors.push(
                "class_id",
                FieldErrorCode::InvalidChoice,
                format!("\"{}\" is not a registered brick class.", item.class_id),
            );
        }
        if self.factory.records().get(&item.record_id).await?.is_none() {
            errors.push(
                "record_id",
                FieldErrorCode::InvalidChoice,
                format!("Record \"{}\" does not exist.", item.record_id),
            );
        }
        errors.into_result()?;

        let mut config = InstanceConfigItem::new(item.class_id, item.record_id);
        config.extra_data = item.extra_data;
        Ok(self.items.create_instance_item(config).await?)
    }

    #[instrument(skip(self, ctx, item), fields(request_id = %ctx.request_id, relation_type = %item.relation_type))]
    pub async fn create_relation_item(&self, ctx: &RequestContext, item: NewRelationItem) -> Result<PanelId> {
        require_superuser(ctx)?;

        if item.relation_type.as_str().trim().is_empty() {
            return Err(ControlError::Validation(FieldErrors::single(
                "relation_type",
                FieldErrorCode::Empty,
                "A relation type is required.",
            )));
        }

        let mut config = RelationConfigItem::new(item.relation_type);
        config.cells = item.cells;
        Ok(self.items.create_relation_item(config).await?)
    }

    #[instrument(skip(self, ctx, item), fields(request_id = %ctx.request_id, record_type = %item.record_type))]
    pub async fn create_custom_item(&self, ctx: &RequestContext, item: NewCustomItem) -> Result<PanelId> {
        require_superuser(ctx)?;

        let mut errors = FieldErrors::new();
        if item.record_type.as_str().trim().is_empty() {
            errors.push("record_type", FieldErrorCode::Empty, "A record type is required.");
        }
        if item.name.trim().is_empty() {
            errors.push("name", FieldErrorCode::Empty, "A name is required.");
        }
        errors.into_result()?;

        let config = CustomFieldConfigItem::new(item.record_type, item.name.trim(), item.cells);
        Ok(self.items.create_custom_item(config).await?)
    }

    pub async fn delete_instance_item(&self, ctx: &RequestContext, id: Uuid) -> Result<()> {
        require_superuser(ctx)?;
        Ok(self.items.delete_instance_item(id).await?)
    }

    pub async fn delete_relation_item(&self, ctx: &RequestContext, id: Uuid) -> Result<()> {
        require_superuser(ctx)?;
        Ok(self.items.delete_relation_item(id).await?)
    }

    pub async fn delete_custom_item(&self, ctx: &RequestContext, id: Uuid) -> Result<()> {
        require_superuser(ctx)?;
        Ok(self.items.delete_custom_item(id).await?)
    }
}
