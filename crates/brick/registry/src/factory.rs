//! Brick materialization
//!
//! Turns the brick ids of one request into bricks. Synthesized bricks are
//! fetched in one batch per kind, as are the anchor records of instance
//! bricks. Nothing here fails the request: unknown ids, stale config rows
//! and failed lookups degrade to placeholders keeping the requested id.

use crate::error::{RegistryError, Result};
use crate::panel::{CustomPanel, Panel, PanelBody, RelationPanel, VoidReason, DEFAULT_PAGE_SIZE};
use crate::permission::PermissionChecker;
use crate::registry::PanelRegistry;
use crate::render::Surface;
use crate::source::RecordSource;
use brick_store::ConfigItemStorage;
use brick_types::{
    CustomFieldConfigItem, InstanceConfigItem, PanelDescriptor, PanelId, PanelOrigin, Record,
    RecordId, RecordType, RelationConfigItem, User,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

/// Config rows and anchors of the synthesized bricks of one request
#[derive(Default)]
struct Synthesized {
    instances: HashMap<Uuid, InstanceConfigItem>,
    anchors: HashMap<RecordId, Record>,
    relations: HashMap<Uuid, RelationConfigItem>,
    customs: HashMap<Uuid, CustomFieldConfigItem>,
}

/// Builds bricks for a request
#[derive(Clone)]
pub struct PanelFactory {
    registry: Arc<PanelRegistry>,
    items: Arc<dyn ConfigItemStorage>,
    records: Arc<dyn RecordSource>,
    permissions: Arc<dyn PermissionChecker>,
    page_size: usize,
}

impl PanelFactory {
    pub fn new(
        registry: Arc<PanelRegistry>,
        items: Arc<dyn ConfigItemStorage>,
        records: Arc<dyn RecordSource>,
        permissions: Arc<dyn PermissionChecker>,
    ) -> Self {
        Self {
            registry,
            items,
            records,
            permissions,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Page size of relation bricks.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn registry(&self) -> &Arc<PanelRegistry> {
        &self.registry
    }

    pub fn records(&self) -> &Arc<dyn RecordSource> {
        &self.records
    }

    pub fn permissions(&self) -> &Arc<dyn PermissionChecker> {
        &self.permissions
    }

    /// Resolve ids to bricks, in request order.
    ///
    /// With a host record, bricks incompatible with its type become Void
    /// placeholders. Without one, record-bound bricks do.
    pub async fn materialize(
        &self,
        ids: &[PanelId],
        record: Option<&Record>,
        user: &User,
    ) -> Vec<Panel> {
        let synthesized = self.fetch_synthesized(ids).await;
        let record_type = record.map(|r| &r.record_type);

        ids.iter()
            .map(|id| {
                let panel = self.build(id, record_type, &synthesized);
                let panel = self.check_compatibility(panel, record_type);
                self.check_permissions(panel, user)
            })
            .collect()
    }

    async fn fetch_synthesized(&self, ids: &[PanelId]) -> Synthesized {
        let (mut instance_ids, mut relation_ids, mut custom_ids) = (Vec::new(), Vec::new(), Vec::new());
        for id in ids {
            match id.origin() {
                PanelOrigin::Instance(token) => instance_ids.push(token),
                PanelOrigin::Relation(token) => relation_ids.push(token),
                PanelOrigin::Custom(token) => custom_ids.push(token),
                PanelOrigin::Static => {}
            }
        }

        let mut synthesized = Synthesized::default();

        if !instance_ids.is_empty() {
            match self.items.instance_items(&instance_ids).await {
                Ok(items) => {
                    synthesized.instances = items.into_iter().map(|i| (i.id, i)).collect();
                }
                Err(e) => warn!(error = %e, "Failed to fetch instance brick configs"),
            }

            let anchor_ids: Vec<RecordId> = synthesized
                .instances
                .values()
                .map(|i| i.record_id.clone())
                .collect();
            if !anchor_ids.is_empty() {
                match self.records.bulk_fetch(&anchor_ids).await {
                    Ok(records) => {
                        synthesized.anchors = records.into_iter().map(|r| (r.id.clone(), r)).collect();
                    }
                    Err(e) => warn!(error = %e, "Failed to fetch instance brick anchors"),
                }
            }
        }

        if !relation_ids.is_empty() {
            match self.items.relation_items(&relation_ids).await {
                Ok(items) => {
                    synthesized.relations = items.into_iter().map(|i| (i.id, i)).collect();
                }
                Err(e) => warn!(error = %e, "Failed to fetch relation brick configs"),
            }
        }

        if !custom_ids.is_empty() {
            match self.items.custom_items(&custom_ids).await {
                Ok(items) => {
                    synthesized.customs = items.into_iter().map(|i| (i.id, i)).collect();
                }
                Err(e) => warn!(error = %e, "Failed to fetch custom brick configs"),
            }
        }

        synthesized
    }

    fn build(
        &self,
        id: &PanelId,
        record_type: Option<&RecordType>,
        synthesized: &Synthesized,
    ) -> Panel {
        let unknown = || {
            warn!(panel_id = %id, "Unknown brick id");
            Panel::void(id.clone(), VoidReason::Unknown)
        };

        match id.origin() {
            PanelOrigin::Static => match self.registry.get_for_record(id, record_type) {
                Ok(panel) => panel.clone(),
                Err(_) => unknown(),
            },
            PanelOrigin::Relation(token) => match synthesized.relations.get(&token) {
                Some(item) => Panel::relation(item.clone(), self.page_size),
                None => unknown(),
            },
            PanelOrigin::Custom(token) => match synthesized.customs.get(&token) {
                Some(item) => Panel::custom(item.clone()),
                None => unknown(),
            },
            PanelOrigin::Instance(token) => {
                let Some(item) = synthesized.instances.get(&token) else {
                    return unknown();
                };
                let Some(class) = self.registry.instance_class(&item.class_id) else {
                    warn!(panel_id = %id, class_id = %item.class_id, "Instance brick class is not registered");
                    return Panel::void(id.clone(), VoidReason::Unavailable);
                };
                let Some(anchor) = synthesized.anchors.get(&item.record_id) else {
                    warn!(panel_id = %id, record_id = %item.record_id, "Instance brick anchor record is gone");
                    return Panel::void(id.clone(), VoidReason::Unavailable);
                };
                Panel::instance(class.clone(), item.clone(), anchor.clone())
            }
        }
    }

    fn check_compatibility(&self, panel: Panel, record_type: Option<&RecordType>) -> Panel {
        if panel.kind().is_placeholder() {
            return panel;
        }

        let compatible = match record_type {
            Some(rt) => panel.is_compatible_with(rt) && !self.registry.is_invalid_for(panel.id(), rt),
            None => !panel.kind().requires_record(),
        };
        if compatible {
            panel
        } else {
            warn!(panel_id = %panel.id(), "Brick is not compatible with this page");
            Panel::void(panel.id().clone(), VoidReason::Incompatible)
        }
    }

    fn check_permissions(&self, panel: Panel, user: &User) -> Panel {
        let permissions = panel.descriptor().permissions.clone();
        for permission in &permissions {
            match self.permissions.has_permission(user, permission) {
                Ok(true) => continue,
                Ok(false) => return forbid(panel, format!("Missing permission: {}", permission)),
                Err(RegistryError::PermissionDenied(reason)) => return forbid(panel, reason),
                Err(e) => {
                    warn!(panel_id = %panel.id(), error = %e, "Permission check failed");
                    return forbid(panel, "Permission check failed".to_string());
                }
            }
        }

        if let PanelBody::Instance(instance) = panel.body() {
            match self.permissions.can_view(user, &instance.anchor) {
                Ok(true) => {}
                Ok(false) => {
                    let reason = format!("Cannot view {}", instance.anchor.record_type);
                    return forbid(panel, reason);
                }
                Err(e) => {
                    warn!(panel_id = %panel.id(), error = %e, "Permission check failed");
                    return forbid(panel, "Permission check failed".to_string());
                }
            }
        }

        panel
    }

    /// Descriptors of every brick an administrator may place on detail
    /// pages of a record type.
    pub async fn resolve_for_record_type(&self, record_type: &RecordType) -> Result<Vec<PanelDescriptor>> {
        let mut descriptors: Vec<PanelDescriptor> = vec![self.registry.record_panel(record_type).descriptor().clone()];
        descriptors.extend(
            self.registry
                .compatible_static(record_type)
                .into_iter()
                .map(|p| p.descriptor().clone()),
        );

        descriptors.extend(
            self.items
                .all_relation_items()
                .await?
                .iter()
                .map(RelationPanel::descriptor_for),
        );
        descriptors.extend(
            self.items
                .custom_items_for_type(record_type)
                .await?
                .iter()
                .map(CustomPanel::descriptor_for),
        );
        descriptors.extend(self.instance_descriptors(Surface::Detail, Some(record_type)).await?);

        Ok(descriptors)
    }

    /// Bricks offered for the layers shared by every record type: no custom
    /// field groups, and only bricks without target types.
    pub async fn resolve_for_any_record_type(&self) -> Result<Vec<PanelDescriptor>> {
        let mut descriptors: Vec<PanelDescriptor> = vec![self
            .registry
            .get_for_record(&PanelId::new(PanelId::RECORD_FIELDS), None)?
            .descriptor()
            .clone()];
        descriptors.extend(
            self.registry
                .generic_static()
                .into_iter()
                .map(|p| p.descriptor().clone()),
        );
        descriptors.extend(
            self.items
                .all_relation_items()
                .await?
                .iter()
                .map(RelationPanel::descriptor_for),
        );
        descriptors.extend(
            self.instance_descriptors(Surface::Detail, None)
                .await?
                .into_iter()
                .filter(|d| d.target_record_types.is_empty()),
        );
        Ok(descriptors)
    }

    pub async fn resolve_for_home(&self) -> Result<Vec<PanelDescriptor>> {
        let mut descriptors: Vec<PanelDescriptor> = self
            .registry
            .home_panels()
            .into_iter()
            .map(|p| p.descriptor().clone())
            .collect();
        descriptors.extend(self.instance_descriptors(Surface::Home, None).await?);
        Ok(descriptors)
    }

    async fn instance_descriptors(
        &self,
        surface: Surface,
        record_type: Option<&RecordType>,
    ) -> Result<Vec<PanelDescriptor>> {
        let items = self.items.all_instance_items().await?;
        Ok(items
            .iter()
            .filter_map(|item| {
                let class = self.registry.instance_class(&item.class_id)?;
                let descriptor = class.descriptor_for(item);
                let displayable = class.templates.for_surface(surface).is_some()
                    && record_type.map_or(true, |rt| descriptor.is_compatible_with(rt));
                displayable.then_some(descriptor)
            })
            .collect())
    }
}

fn forbid(panel: Panel, reason: String) -> Panel {
    let descriptor = panel.descriptor();
    Panel::forbidden(descriptor.id.clone(), descriptor.verbose_name.clone(), reason)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::panel::{InstanceClass, Templates};
    use crate::permission::{AllowAllPermissions, RolePermissions};
    use crate::source::InMemoryRecordSource;
    use async_trait::async_trait;
    use brick_store::{InMemoryStorage, StoreError};
    use brick_types::{PanelKind, RelationTypeId};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn registry() -> PanelRegistry {
        let mut builder = PanelRegistry::builder();
        builder
            .register(Panel::simple(
                PanelDescriptor::new("persons-card", PanelKind::Simple).targeting("persons.contact"),
                Templates::detail("card.html"),
            ))
            .unwrap()
            .register(Panel::simple(
                PanelDescriptor::new("billing-totals", PanelKind::Simple).requiring("billing"),
                Templates::both("totals.html", "totals-home.html"),
            ))
            .unwrap()
            .register_instance_class(
                InstanceClass::new("reports-graph", Templates::home("graph.html"))
                    .with_verbose_name("Graph"),
            )
            .unwrap();
        builder.build()
    }

    fn factory(
        items: Arc<dyn ConfigItemStorage>,
        records: InMemoryRecordSource,
        permissions: Arc<dyn PermissionChecker>,
    ) -> PanelFactory {
        PanelFactory::new(Arc::new(registry()), items, Arc::new(records), permissions)
    }

    fn contact() -> Record {
        Record::new("c1", "persons.contact", "Spike")
    }

    #[tokio::test]
    async fn test_unknown_ids_degrade() {
        let f = factory(
            Arc::new(InMemoryStorage::new()),
            InMemoryRecordSource::new(),
            Arc::new(AllowAllPermissions),
        );
        let ids = vec![
            PanelId::new("persons-card"),
            PanelId::new("nope"),
            PanelId::for_relation(Uuid::new_v4()),
        ];

        let panels = f.materialize(&ids, Some(&contact()), &User::new("u1")).await;
        assert_eq!(panels.len(), 3);
        assert_eq!(panels[0].kind(), PanelKind::Simple);
        assert!(panels[1].is_unknown());
        assert!(panels[2].is_unknown());
        assert_eq!(panels[2].id(), &ids[2]);
    }

    #[tokio::test]
    async fn test_incompatible_panels_become_void() {
        let f = factory(
            Arc::new(InMemoryStorage::new()),
            InMemoryRecordSource::new(),
            Arc::new(AllowAllPermissions),
        );
        let invoice = Record::new("i1", "billing.invoice", "#1");

        let panels = f
            .materialize(&[PanelId::new("persons-card")], Some(&invoice), &User::new("u1"))
            .await;
        assert!(matches!(panels[0].body(), PanelBody::Void(VoidReason::Incompatible)));
    }

    #[tokio::test]
    async fn test_forbidden_keeps_id() {
        let f = factory(
            Arc::new(InMemoryStorage::new()),
            InMemoryRecordSource::new(),
            Arc::new(RolePermissions::new().grant("accounting", "billing")),
        );
        let ids = [PanelId::new("billing-totals")];

        let panels = f.materialize(&ids, None, &User::new("u1").with_role("sales")).await;
        assert_eq!(panels[0].kind(), PanelKind::Forbidden);
        assert_eq!(panels[0].id(), &ids[0]);

        let panels = f
            .materialize(&ids, None, &User::new("u2").with_role("accounting"))
            .await;
        assert_eq!(panels[0].kind(), PanelKind::Simple);
    }

    #[tokio::test]
    async fn test_materialize_is_idempotent() {
        let storage = Arc::new(InMemoryStorage::new());
        let item = RelationConfigItem::new("persons.employs");
        let relation_id = item.panel_id();
        storage.insert_relation_item(item).await.unwrap();

        let f = factory(
            storage,
            InMemoryRecordSource::new(),
            Arc::new(RolePermissions::new().grant("accounting", "billing")),
        );
        let ids = vec![
            PanelId::new("persons-card"),
            relation_id,
            PanelId::new("billing-totals"),
            PanelId::new("nope"),
        ];
        let user = User::new("u1").with_role("sales");

        let first = f.materialize(&ids, Some(&contact()), &user).await;
        let second = f.materialize(&ids, Some(&contact()), &user).await;
        assert_eq!(first, second);
        let got: Vec<&PanelId> = first.iter().map(Panel::id).collect();
        assert_eq!(got, ids.iter().collect::<Vec<_>>());
    }

    struct Raising;

    impl PermissionChecker for Raising {
        fn has_permission(&self, _user: &User, permission: &str) -> Result<bool> {
            Err(RegistryError::PermissionDenied(format!("{} is restricted", permission)))
        }
    }

    #[tokio::test]
    async fn test_raising_checker_forbids() {
        let f = factory(
            Arc::new(InMemoryStorage::new()),
            InMemoryRecordSource::new(),
            Arc::new(Raising),
        );
        let panels = f
            .materialize(&[PanelId::new("billing-totals"), PanelId::new("persons-card")], Some(&contact()), &User::new("u1"))
            .await;

        let PanelBody::Forbidden { reason } = panels[0].body() else {
            panic!("expected a forbidden placeholder");
        };
        assert_eq!(reason, "billing is restricted");
        // No permission required, nothing to check.
        assert_eq!(panels[1].kind(), PanelKind::Simple);
    }

    #[tokio::test]
    async fn test_instance_panels_need_anchor() {
        let storage = Arc::new(InMemoryStorage::new());
        let records = InMemoryRecordSource::new();
        records
            .insert_record(Record::new("r1", "reports.report", "Sales"))
            .await;

        let anchored = InstanceConfigItem::new("reports-graph", "r1");
        let orphan = InstanceConfigItem::new("reports-graph", "r404");
        let ids = [anchored.panel_id(), orphan.panel_id()];
        storage.insert_instance_item(anchored).await.unwrap();
        storage.insert_instance_item(orphan).await.unwrap();

        let f = factory(storage, records, Arc::new(AllowAllPermissions));
        let panels = f.materialize(&ids, None, &User::new("u1")).await;
        assert_eq!(panels[0].kind(), PanelKind::InstanceBound);
        assert!(matches!(panels[1].body(), PanelBody::Void(VoidReason::Unavailable)));
    }

    #[tokio::test]
    async fn test_record_bound_panels_need_host() {
        let storage = Arc::new(InMemoryStorage::new());
        let item = RelationConfigItem::new("employs");
        let id = item.panel_id();
        storage.insert_relation_item(item).await.unwrap();

        let f = factory(storage, InMemoryRecordSource::new(), Arc::new(AllowAllPermissions));
        let panels = f.materialize(&[id.clone()], None, &User::new("u1")).await;
        assert!(matches!(panels[0].body(), PanelBody::Void(VoidReason::Incompatible)));

        let panels = f.materialize(&[id], Some(&contact()), &User::new("u1")).await;
        assert_eq!(panels[0].kind(), PanelKind::RelationBound);
    }

    /// Counts batch fetches
    #[derive(Default)]
    struct CountingItems {
        inner: InMemoryStorage,
        relation_fetches: AtomicUsize,
    }

    #[async_trait]
    impl ConfigItemStorage for CountingItems {
        async fn insert_instance_item(&self, item: InstanceConfigItem) -> brick_store::Result<()> {
            self.inner.insert_instance_item(item).await
        }
        async fn instance_items(&self, ids: &[Uuid]) -> brick_store::Result<Vec<InstanceConfigItem>> {
            self.inner.instance_items(ids).await
        }
        async fn all_instance_items(&self) -> brick_store::Result<Vec<InstanceConfigItem>> {
            self.inner.all_instance_items().await
        }
        async fn delete_instance_item(&self, id: &Uuid) -> brick_store::Result<bool> {
            self.inner.delete_instance_item(id).await
        }
        async fn insert_relation_item(&self, item: RelationConfigItem) -> brick_store::Result<()> {
            self.inner.insert_relation_item(item).await
        }
        async fn relation_items(&self, ids: &[Uuid]) -> brick_store::Result<Vec<RelationConfigItem>> {
            self.relation_fetches.fetch_add(1, Ordering::SeqCst);
            self.inner.relation_items(ids).await
        }
        async fn relation_item_for_type(
            &self,
            relation_type: &RelationTypeId,
        ) -> brick_store::Result<Option<RelationConfigItem>> {
            self.inner.relation_item_for_type(relation_type).await
        }
        async fn all_relation_items(&self) -> brick_store::Result<Vec<RelationConfigItem>> {
            self.inner.all_relation_items().await
        }
        async fn delete_relation_item(&self, id: &Uuid) -> brick_store::Result<bool> {
            self.inner.delete_relation_item(id).await
        }
        async fn insert_custom_item(&self, item: CustomFieldConfigItem) -> brick_store::Result<()> {
            self.inner.insert_custom_item(item).await
        }
        async fn custom_items(&self, ids: &[Uuid]) -> brick_store::Result<Vec<CustomFieldConfigItem>> {
            self.inner.custom_items(ids).await
        }
        async fn custom_items_for_type(
            &self,
            record_type: &RecordType,
        ) -> brick_store::Result<Vec<CustomFieldConfigItem>> {
            self.inner.custom_items_for_type(record_type).await
        }
        async fn delete_custom_item(&self, id: &Uuid) -> brick_store::Result<bool> {
            self.inner.delete_custom_item(id).await
        }
    }

    #[tokio::test]
    async fn test_synthesized_panels_fetched_in_one_batch() {
        let storage = Arc::new(CountingItems::default());
        let mut ids = Vec::new();
        for rtype in ["employs", "customer_of", "supplier_of"] {
            let item = RelationConfigItem::new(rtype);
            ids.push(item.panel_id());
            storage.insert_relation_item(item).await.unwrap();
        }

        let f = factory(storage.clone(), InMemoryRecordSource::new(), Arc::new(AllowAllPermissions));
        let panels = f.materialize(&ids, Some(&contact()), &User::new("u1")).await;

        assert!(panels.iter().all(|p| p.kind() == PanelKind::RelationBound));
        assert_eq!(storage.relation_fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_resolve_for_record_type() {
        let storage = Arc::new(InMemoryStorage::new());
        storage
            .insert_relation_item(RelationConfigItem::new("employs"))
            .await
            .unwrap();
        storage
            .insert_custom_item(CustomFieldConfigItem::new("persons.contact", "Social", vec![]))
            .await
            .unwrap();
        storage
            .insert_custom_item(CustomFieldConfigItem::new("billing.invoice", "Bank", vec![]))
            .await
            .unwrap();
        storage
            .insert_instance_item(InstanceConfigItem::new("reports-graph", "r1"))
            .await
            .unwrap();

        let f = factory(storage, InMemoryRecordSource::new(), Arc::new(AllowAllPermissions));
        let descriptors = f.resolve_for_record_type(&"persons.contact".into()).await.unwrap();
        let kinds: Vec<_> = descriptors.iter().map(|d| d.kind).collect();

        assert_eq!(descriptors[0].id.as_str(), PanelId::RECORD_FIELDS);
        assert!(descriptors.iter().any(|d| d.id.as_str() == "persons-card"));
        assert_eq!(kinds.iter().filter(|k| **k == PanelKind::RelationBound).count(), 1);
        assert_eq!(kinds.iter().filter(|k| **k == PanelKind::CustomFieldBound).count(), 1);
        // The graph class has no detail template.
        assert!(!kinds.contains(&PanelKind::InstanceBound));

        let shared = f.resolve_for_any_record_type().await.unwrap();
        assert!(shared.iter().all(|d| d.kind != PanelKind::CustomFieldBound));
        assert!(!shared.iter().any(|d| d.id.as_str() == "persons-card"));
        assert_eq!(shared.iter().filter(|d| d.kind == PanelKind::RelationBound).count(), 1);

        let home = f.resolve_for_home().await.unwrap();
        assert!(home.iter().any(|d| d.kind == PanelKind::InstanceBound));
        assert!(home.iter().any(|d| d.id.as_str() == "billing-totals"));
    }

    #[test]
    fn test_store_error_converts() {
        let err: RegistryError = StoreError::NotFound("x".into()).into();
        assert!(!err.is_registration());
    }
}
