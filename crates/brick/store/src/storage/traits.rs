//! Storage trait definitions

use crate::error::Result;
use async_trait::async_trait;
use brick_types::{
    Audience, CustomFieldConfigItem, HomePlacementRule, InstanceConfigItem, MyPagePlacementRule,
    PanelId, PanelState, PlacementRule, RecordType, RelationConfigItem, RelationTypeId, UserId,
};
use uuid::Uuid;

/// Combined storage trait
pub trait BrickStorage: PlacementStorage + ConfigItemStorage + StateStorage + Send + Sync {}

/// Storage for placement rows
#[async_trait]
pub trait PlacementStorage: Send + Sync {
    /// Detail rows matching any of the record types (None = global layer)
    /// and any of the audiences, in one query.
    async fn detail_rules(
        &self,
        record_types: &[Option<RecordType>],
        audiences: &[Audience],
    ) -> Result<Vec<PlacementRule>>;

    /// Replace every row of one detail layer.
    async fn replace_detail_layer(
        &self,
        record_type: Option<&RecordType>,
        audience: &Audience,
        rules: Vec<PlacementRule>,
    ) -> Result<()>;

    /// Delete one detail layer, returning the number of rows removed.
    async fn delete_detail_layer(
        &self,
        record_type: Option<&RecordType>,
        audience: &Audience,
    ) -> Result<usize>;

    /// Home rows for any of the audiences.
    async fn home_rules(&self, audiences: &[Audience]) -> Result<Vec<HomePlacementRule>>;

    async fn replace_home_layer(
        &self,
        audience: &Audience,
        rules: Vec<HomePlacementRule>,
    ) -> Result<()>;

    async fn delete_home_layer(&self, audience: &Audience) -> Result<usize>;

    /// "My page" rows for any of the users (None = default template).
    async fn mypage_rules(&self, users: &[Option<UserId>]) -> Result<Vec<MyPagePlacementRule>>;

    async fn replace_mypage_layer(
        &self,
        user: Option<&UserId>,
        rules: Vec<MyPagePlacementRule>,
    ) -> Result<()>;

    /// Number of placement rows, of any surface, referencing a brick.
    async fn count_references(&self, panel_id: &PanelId) -> Result<usize>;
}

/// Storage for config items backing synthesized bricks
#[async_trait]
pub trait ConfigItemStorage: Send + Sync {
    async fn insert_instance_item(&self, item: InstanceConfigItem) -> Result<()>;

    /// Batch fetch; unknown ids are skipped.
    async fn instance_items(&self, ids: &[Uuid]) -> Result<Vec<InstanceConfigItem>>;

    async fn all_instance_items(&self) -> Result<Vec<InstanceConfigItem>>;

    async fn delete_instance_item(&self, id: &Uuid) -> Result<bool>;

    async fn insert_relation_item(&self, item: RelationConfigItem) -> Result<()>;

    async fn relation_items(&self, ids: &[Uuid]) -> Result<Vec<RelationConfigItem>>;

    async fn relation_item_for_type(
        &self,
        relation_type: &RelationTypeId,
    ) -> Result<Option<RelationConfigItem>>;

    async fn all_relation_items(&self) -> Result<Vec<RelationConfigItem>>;

    async fn delete_relation_item(&self, id: &Uuid) -> Result<bool>;

    async fn insert_custom_item(&self, item: CustomFieldConfigItem) -> Result<()>;

    async fn custom_items(&self, ids: &[Uuid]) -> Result<Vec<CustomFieldConfigItem>>;

    async fn custom_items_for_type(
        &self,
        record_type: &RecordType,
    ) -> Result<Vec<CustomFieldConfigItem>>;

    async fn delete_custom_item(&self, id: &Uuid) -> Result<bool>;
}

/// Storage for panel states, unique per (user, brick)
#[async_trait]
pub trait StateStorage: Send + Sync {
    async fn fetch_state(&self, user_id: &UserId, panel_id: &PanelId) -> Result<Option<PanelState>>;

    /// Batch fetch; missing rows are simply absent from the result.
    async fn fetch_states(&self, user_id: &UserId, panel_ids: &[PanelId])
        -> Result<Vec<PanelState>>;

    /// Insert a new row; fails with `StoreError::UniqueViolation` when a row
    /// already exists for the pair.
    async fn insert_state(&self, state: &PanelState) -> Result<()>;

    /// Update an existing row; returns false when the row does not exist.
    async fn update_state(&self, state: &PanelState) -> Result<bool>;
}
