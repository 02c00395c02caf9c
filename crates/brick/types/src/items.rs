//! Configuration rows backing synthesized bricks
//!
//! Each row owns a stable brick id made of a reserved prefix and the row's
//! uuid. Rows cannot be deleted while a placement still references them.

use crate::{InstanceClassId, PanelId, RecordId, RecordType, RelationTypeId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Brick bound to one record through a registered instance class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceConfigItem {
    pub id: Uuid,
    pub class_id: InstanceClassId,
    /// Record the brick is anchored on
    pub record_id: RecordId,
    #[serde(default)]
    pub extra_data: serde_json::Map<String, serde_json::Value>,
}

impl InstanceConfigItem {
    pub fn new(class_id: impl Into<InstanceClassId>, record_id: impl Into<RecordId>) -> Self {
        Self {
            id: Uuid::new_v4(),
            class_id: class_id.into(),
            record_id: record_id.into(),
            extra_data: serde_json::Map::new(),
        }
    }

    pub fn panel_id(&self) -> PanelId {
        PanelId::for_instance(self.id)
    }
}

/// Brick listing the host record's relations of one relation type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationConfigItem {
    pub id: Uuid,
    pub relation_type: RelationTypeId,
    /// Field columns shown per object record type
    #[serde(default)]
    pub cells: BTreeMap<RecordType, Vec<String>>,
}

impl RelationConfigItem {
    pub fn new(relation_type: impl Into<RelationTypeId>) -> Self {
        Self {
            id: Uuid::new_v4(),
            relation_type: relation_type.into(),
            cells: BTreeMap::new(),
        }
    }

    pub fn with_cells(mut self, record_type: impl Into<RecordType>, cells: Vec<String>) -> Self {
        self.cells.insert(record_type.into(), cells);
        self
    }

    pub fn panel_id(&self) -> PanelId {
        PanelId::for_relation(self.id)
    }
}

/// Brick showing a named group of fields of one record type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomFieldConfigItem {
    pub id: Uuid,
    pub record_type: RecordType,
    pub name: String,
    pub cells: Vec<String>,
}

impl CustomFieldConfigItem {
    pub fn new(record_type: impl Into<RecordType>, name: impl Into<String>, cells: Vec<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            record_type: record_type.into(),
            name: name.into(),
            cells,
        }
    }

    pub fn panel_id(&self) -> PanelId {
        PanelId::for_custom(self.id)
    }
}
