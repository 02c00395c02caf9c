//! In-memory storage implementation

use super::traits::*;
use crate::error::{Result, StoreError};
use async_trait::async_trait;
use brick_types::{
    Audience, CustomFieldConfigItem, HomePlacementRule, InstanceConfigItem, MyPagePlacementRule,
    PanelId, PanelState, PlacementRule, RecordType, RelationConfigItem, RelationTypeId, UserId,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-memory storage for development and testing
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    detail: Arc<RwLock<Vec<PlacementRule>>>,
    home: Arc<RwLock<Vec<HomePlacementRule>>>,
    mypage: Arc<RwLock<Vec<MyPagePlacementRule>>>,
    instance_items: Arc<RwLock<HashMap<Uuid, InstanceConfigItem>>>,
    relation_items: Arc<RwLock<HashMap<Uuid, RelationConfigItem>>>,
    custom_items: Arc<RwLock<HashMap<Uuid, CustomFieldConfigItem>>>,
    // Vec rather than map so that a broken uniqueness check would show up
    // as duplicate rows.
    states: Arc<RwLock<Vec<PanelState>>>,
}

impl InMemoryStorage {
    /// Create a new in-memory storage
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of state rows stored for a (user, brick) pair.
    pub async fn count_states(&self, user_id: &UserId, panel_id: &PanelId) -> usize {
        self.states
            .read()
            .await
            .iter()
            .filter(|s| &s.user_id == user_id && &s.panel_id == panel_id)
            .count()
    }
}

impl BrickStorage for InMemoryStorage {}

#[async_trait]
impl PlacementStorage for InMemoryStorage {
    async fn detail_rules(
        &self,
        record_types: &[Option<RecordType>],
        audiences: &[Audience],
    ) -> Result<Vec<PlacementRule>> {
        let detail = self.detail.read().await;
        Ok(detail
            .iter()
            .filter(|r| record_types.contains(&r.record_type) && audiences.contains(&r.audience))
            .cloned()
            .collect())
    }

    async fn replace_detail_layer(
        &self,
        record_type: Option<&RecordType>,
        audience: &Audience,
        rules: Vec<PlacementRule>,
    ) -> Result<()> {
        let mut detail = self.detail.write().await;
        detail.retain(|r| !r.belongs_to(record_type, audience));
        detail.extend(rules);
        Ok(())
    }

    async fn delete_detail_layer(
        &self,
        record_type: Option<&RecordType>,
        audience: &Audience,
    ) -> Result<usize> {
        let mut detail = self.detail.write().await;
        let before = detail.len();
        detail.retain(|r| !r.belongs_to(record_type, audience));
        Ok(before - detail.len())
    }

    async fn home_rules(&self, audiences: &[Audience]) -> Result<Vec<HomePlacementRule>> {
        let home = self.home.read().await;
        Ok(home
            .iter()
            .filter(|r| audiences.contains(&r.audience))
            .cloned()
            .collect())
    }

    async fn replace_home_layer(
        &self,
        audience: &Audience,
        rules: Vec<HomePlacementRule>,
    ) -> Result<()> {
        let mut home = self.home.write().await;
        home.retain(|r| &r.audience != audience);
        home.extend(rules);
        Ok(())
    }

    async fn delete_home_layer(&self, audience: &Audience) -> Result<usize> {
        let mut home = self.home.write().await;
        let before = home.len();
        home.retain(|r| &r.audience != audience);
        Ok(before - home.len())
    }

    async fn mypage_rules(&self, users: &[Option<UserId>]) -> Result<Vec<MyPagePlacementRule>> {
        let mypage = self.mypage.read().await;
        Ok(mypage
            .iter()
            .filter(|r| users.contains(&r.user))
            .cloned()
            .collect())
    }

    async fn replace_mypage_layer(
        &self,
        user: Option<&UserId>,
        rules: Vec<MyPagePlacementRule>,
    ) -> Result<()> {
        let mut mypage = self.mypage.write().await;
        mypage.retain(|r| r.user.as_ref() != user);
        mypage.extend(rules);
        Ok(())
    }

    async fn count_references(&self, panel_id: &PanelId) -> Result<usize> {
        let detail = self
            .detail
            .read()
            .await
            .iter()
            .filter(|r| &r.panel_id == panel_id)
            .count();
        let home = self
            .home
            .read()
            .await
            .iter()
            .filter(|r| &r.panel_id == panel_id)
            .count();
        let mypage = self
            .mypage
            .read()
            .await
            .iter()
            .filter(|r| &r.panel_id == panel_id)
            .count();

        Ok(detail + home + mypage)
    }
}

#[async_trait]
impl ConfigItemStorage for InMemoryStorage {
    async fn insert_instance_item(&self, item: InstanceConfigItem) -> Result<()> {
        self.instance_items.write().await.insert(item.id, item);
        Ok(())
    }

    async fn instance_items(&self, ids: &[Uuid]) -> Result<Vec<InstanceConfigItem>> {
        let items = self.instance_items.read().await;
        Ok(ids.iter().filter_map(|id| items.get(id).cloned()).collect())
    }

    async fn all_instance_items(&self) -> Result<Vec<InstanceConfigItem>> {
        Ok(self.instance_items.read().await.values().cloned().collect())
    }

    async fn delete_instance_item(&self, id: &Uuid) -> Result<bool> {
        Ok(self.instance_items.write().await.remove(id).is_some())
    }

    async fn insert_relation_item(&self, item: RelationConfigItem) -> Result<()> {
        let mut items = self.relation_items.write().await;
        if items
            .values()
            .any(|existing| existing.relation_type == item.relation_type)
        {
            return Err(StoreError::Conflict(
                crate::ConflictReason::DuplicateRelationItem {
                    relation_type: item.relation_type,
                },
            ));
        }
        items.insert(item.id, item);
        Ok(())
    }

    async fn relation_items(&self, ids: &[Uuid]) -> Result<Vec<RelationConfigItem>> {
        let items = self.relation_items.read().await;
        Ok(ids.iter().filter_map(|id| items.get(id).cloned()).collect())
    }

    async fn relation_item_for_type(
        &self,
        relation_type: &RelationTypeId,
    ) -> Result<Option<RelationConfigItem>> {
        let items = self.relation_items.read().await;
        Ok(items
            .values()
            .find(|item| &item.relation_type == relation_type)
            .cloned())
    }

    async fn all_relation_items(&self) -> Result<Vec<RelationConfigItem>> {
        Ok(self.relation_items.read().await.values().cloned().collect())
    }

    async fn delete_relation_item(&self, id: &Uuid) -> Result<bool> {
        Ok(self.relation_items.write().await.remove(id).is_some())
    }

    async fn insert_custom_item(&self, item: CustomFieldConfigItem) -> Result<()> {
        self.custom_items.write().await.insert(item.id, item);
        Ok(())
    }

    async fn custom_items(&self, ids: &[Uuid]) -> Result<Vec<CustomFieldConfigItem>> {
        let items = self.custom_items.read().await;
        Ok(ids.iter().filter_map(|id| items.get(id).cloned()).collect())
    }

    async fn custom_items_for_type(
        &self,
        record_type: &RecordType,
    ) -> Result<Vec<CustomFieldConfigItem>> {
        let items = self.custom_items.read().await;
        Ok(items
            .values()
            .filter(|item| &item.record_type == record_type)
            .cloned()
            .collect())
    }

    async fn delete_custom_item(&self, id: &Uuid) -> Result<bool> {
        Ok(self.custom_items.write().await.remove(id).is_some())
    }
}

#[async_trait]
impl StateStorage for InMemoryStorage {
    async fn fetch_state(&self, user_id: &UserId, panel_id: &PanelId) -> Result<Option<PanelState>> {
        let states = self.states.read().await;
        Ok(states
            .iter()
            .find(|s| &s.user_id == user_id && &s.panel_id == panel_id)
            .cloned())
    }

    async fn fetch_states(
        &self,
        user_id: &UserId,
        panel_ids: &[PanelId],
    ) -> Result<Vec<PanelState>> {
        let states = self.states.read().await;
        Ok(states
            .iter()
            .filter(|s| &s.user_id == user_id && panel_ids.contains(&s.panel_id))
            .cloned()
            .collect())
    }

    async fn insert_state(&self, state: &PanelState) -> Result<()> {
        let mut states = self.states.write().await;
        if states
            .iter()
            .any(|s| s.user_id == state.user_id && s.panel_id == state.panel_id)
        {
            return Err(StoreError::UniqueViolation {
                user_id: state.user_id.clone(),
                panel_id: state.panel_id.clone(),
            });
        }
        states.push(state.clone());
        Ok(())
    }

    async fn update_state(&self, state: &PanelState) -> Result<bool> {
        let mut states = self.states.write().await;
        match states
            .iter_mut()
            .find(|s| s.user_id == state.user_id && s.panel_id == state.panel_id)
        {
            Some(existing) => {
                *existing = state.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

}
