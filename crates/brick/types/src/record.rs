//! Minimal views of the host application's models
//!
//! The business models themselves live in the host application; bricks only
//! see records as typed bags of fields.

use crate::{RecordId, RecordType, RelationTypeId, RoleId, UserId};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

/// A business record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub record_type: RecordType,
    pub label: String,
    #[serde(default)]
    pub fields: BTreeMap<String, Value>,
}

impl Record {
    pub fn new(
        id: impl Into<RecordId>,
        record_type: impl Into<RecordType>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            record_type: record_type.into(),
            label: label.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    /// Field value, `Value::Null` when missing.
    pub fn field(&self, name: &str) -> &Value {
        self.fields.get(name).unwrap_or(&Value::Null)
    }

    pub fn to_context(&self) -> Value {
        let fields: Map<String, Value> = self
            .fields
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        json!({
            "id": self.id,
            "type": self.record_type,
            "label": self.label,
            "fields": fields,
        })
    }
}

/// A typed link between two records
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    pub subject: RecordId,
    pub relation_type: RelationTypeId,
    pub object: RecordId,
}

/// The requesting user, as seen by the brick framework
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    #[serde(default)]
    pub role: Option<RoleId>,
    #[serde(default)]
    pub is_superuser: bool,
}

impl User {
    pub fn new(id: impl Into<UserId>) -> Self {
        Self {
            id: id.into(),
            role: None,
            is_superuser: false,
        }
    }

    pub fn with_role(mut self, role: impl Into<RoleId>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn superuser(mut self) -> Self {
        self.is_superuser = true;
        self
    }

    pub fn to_context(&self) -> Value {
        json!({
            "id": self.id,
            "role": self.role,
            "is_superuser": self.is_superuser,
        })
    }
}
