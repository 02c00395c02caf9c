//! Config item lifecycle
//!
//! Config items back synthesized bricks. An item cannot be deleted while a
//! placement row, of any surface, still references its brick id.

use crate::error::{ConflictReason, Result, StoreError};
use crate::storage::{ConfigItemStorage, PlacementStorage};
use brick_types::{CustomFieldConfigItem, InstanceConfigItem, PanelId, RelationConfigItem};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Create and delete config items
pub struct ConfigItemService {
    items: Arc<dyn ConfigItemStorage>,
    placements: Arc<dyn PlacementStorage>,
}

impl ConfigItemService {
    pub fn new(items: Arc<dyn ConfigItemStorage>, placements: Arc<dyn PlacementStorage>) -> Self {
        Self { items, placements }
    }

    pub async fn create_instance_item(&self, item: InstanceConfigItem) -> Result<PanelId> {
        let panel_id = item.panel_id();
        self.items.insert_instance_item(item).await?;
        info!(panel_id = %panel_id, "Created instance brick config");
        Ok(panel_id)
    }

    pub async fn create_relation_item(&self, item: RelationConfigItem) -> Result<PanelId> {
        let panel_id = item.panel_id();
        self.items.insert_relation_item(item).await?;
        info!(panel_id = %panel_id, "Created relation brick config");
        Ok(panel_id)
    }

    pub async fn create_custom_item(&self, item: CustomFieldConfigItem) -> Result<PanelId> {
        let panel_id = item.panel_id();
        self.items.insert_custom_item(item).await?;
        info!(panel_id = %panel_id, "Created custom brick config");
        Ok(panel_id)
    }

    pub async fn delete_instance_item(&self, id: Uuid) -> Result<()> {
        self.ensure_unused(PanelId::for_instance(id)).await?;
        if !self.items.delete_instance_item(&id).await? {
            return Err(StoreError::NotFound(format!("Instance brick config {}", id)));
        }
        Ok(())
    }

    pub async fn delete_relation_item(&self, id: Uuid) -> Result<()> {
        self.ensure_unused(PanelId::for_relation(id)).await?;
        if !self.items.delete_relation_item(&id).await? {
            return Err(StoreError::NotFound(format!("Relation brick config {}", id)));
        }
        Ok(())
    }

    pub async fn delete_custom_item(&self, id: Uuid) -> Result<()> {
        self.ensure_unused(PanelId::for_custom(id)).await?;
        if !self.items.delete_custom_item(&id).await? {
            return Err(StoreError::NotFound(format!("Custom brick config {}", id)));
        }
        Ok(())
    }

    async fn ensure_unused(&self, panel_id: PanelId) -> Result<()> {
        let references = self.placements.count_references(&panel_id).await?;
        if references > 0 {
            return Err(StoreError::Conflict(ConflictReason::ItemInUse {
                panel_id,
                references,
            }));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::placement::PlacementService;
    use crate::storage::InMemoryStorage;
    use brick_types::{Audience, Zone, ZoneLayout};

    fn services() -> (ConfigItemService, PlacementService) {
        let storage = Arc::new(InMemoryStorage::new());
        (
            ConfigItemService::new(storage.clone(), storage.clone()),
            PlacementService::new(storage),
        )
    }

    #[tokio::test]
    async fn test_item_in_use_cannot_be_deleted() {
        let (items, placements) = services();
        let item = RelationConfigItem::new("persons-employed_by");
        let id = item.id;
        let panel_id = items.create_relation_item(item).await.unwrap();

        placements
            .set_detail_layer(
                None,
                &Audience::Superuser,
                &ZoneLayout::new().with_zone(Zone::Right, [panel_id.clone()]),
            )
            .await
            .unwrap();

        let err = items.delete_relation_item(id).await.unwrap_err();
        assert_eq!(
            err.conflict_reason(),
            Some(&ConflictReason::ItemInUse {
                panel_id,
                references: 1
            })
        );

        placements
            .delete_detail_layer(None, &Audience::Superuser)
            .await
            .unwrap();
        items.delete_relation_item(id).await.unwrap();
    }

    #[tokio::test]
    async fn test_home_reference_blocks_deletion() {
        let (items, placements) = services();
        let item = InstanceConfigItem::new("reports-graph", "report-1");
        let id = item.id;
        let panel_id = items.create_instance_item(item).await.unwrap();

        placements
            .set_home_layer(&Audience::Default, &[panel_id])
            .await
            .unwrap();

        assert!(items.delete_instance_item(id).await.is_err());
    }

    #[tokio::test]
    async fn test_delete_unknown_item() {
        let (items, _) = services();
        let err = items.delete_custom_item(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }
}
