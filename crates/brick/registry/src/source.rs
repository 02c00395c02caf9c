//! Record access
//!
//! Bricks never own business data. They read it through a [`RecordSource`]
//! provided by the host application.

use crate::error::Result;
use async_trait::async_trait;
use brick_types::{Record, RecordId, RecordType, Relation, RelationTypeId};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;

/// One ordering criterion; `-field` sorts descending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub descending: bool,
}

impl OrderBy {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: false,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: true,
        }
    }

    /// Parse the `col` / `-col` client notation.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let (field, descending) = match raw.strip_prefix('-') {
            Some(field) => (field, true),
            None => (raw, false),
        };

        if field.is_empty() || field.starts_with('-') {
            return None;
        }
        Some(Self {
            field: field.to_string(),
            descending,
        })
    }
}

impl fmt::Display for OrderBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.descending {
            write!(f, "-{}", self.field)
        } else {
            write!(f, "{}", self.field)
        }
    }
}

/// Records of one type matching equality filters
#[derive(Debug, Clone, PartialEq)]
pub struct RecordQuery {
    pub record_type: RecordType,
    pub filters: BTreeMap<String, Value>,
    pub order_by: Vec<OrderBy>,
}

impl RecordQuery {
    pub fn new(record_type: impl Into<RecordType>) -> Self {
        Self {
            record_type: record_type.into(),
            filters: BTreeMap::new(),
            order_by: Vec::new(),
        }
    }

    pub fn filter(mut self, field: impl Into<String>, value: Value) -> Self {
        self.filters.insert(field.into(), value);
        self
    }

    pub fn ordered_by(mut self, order: OrderBy) -> Self {
        self.order_by = vec![order];
        self
    }

    pub fn matches(&self, record: &Record) -> bool {
        record.record_type == self.record_type
            && self
                .filters
                .iter()
                .all(|(field, value)| record.field(field) == value)
    }
}

/// Slice of a result set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub offset: usize,
    pub limit: usize,
}

/// Read access to the host application's records
#[async_trait]
pub trait RecordSource: Send + Sync {
    async fn get(&self, id: &RecordId) -> Result<Option<Record>>;

    /// Fetch many records at once; missing ids are skipped.
    async fn bulk_fetch(&self, ids: &[RecordId]) -> Result<Vec<Record>>;

    async fn count(&self, query: &RecordQuery) -> Result<usize>;

    async fn filter(&self, query: &RecordQuery, window: Window) -> Result<Vec<Record>>;

    /// Relations whose subject is `subject`, restricted to `relation_types`
    /// unless empty.
    async fn relations(
        &self,
        subject: &RecordId,
        relation_types: &[RelationTypeId],
    ) -> Result<Vec<Relation>>;
}

/// In-memory record source, for tests and the demo catalog
#[derive(Debug, Default, Clone)]
pub struct InMemoryRecordSource {
    records: Arc<RwLock<HashMap<RecordId, Record>>>,
    relations: Arc<RwLock<Vec<Relation>>>,
}

impl InMemoryRecordSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_record(&self, record: Record) {
        self.records.write().await.insert(record.id.clone(), record);
    }

    pub async fn insert_relation(&self, relation: Relation) {
        self.relations.write().await.push(relation);
    }

    fn sort(records: &mut [Record], order_by: &[OrderBy]) {
        records.sort_by(|a, b| {
            for order in order_by {
                let ord = compare_values(a.field(&order.field), b.field(&order.field));
                let ord = if order.descending { ord.reverse() } else { ord };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            a.id.as_str().cmp(b.id.as_str())
        });
    }
}

/// Total order over JSON scalars: null < bool < number < string < others.
fn compare_values(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) | Value::Object(_) => 4,
        }
    }

    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

#[async_trait]
impl RecordSource for InMemoryRecordSource {
    async fn get(&self, id: &RecordId) -> Result<Option<Record>> {
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn bulk_fetch(&self, ids: &[RecordId]) -> Result<Vec<Record>> {
        let records = self.records.read().await;
        Ok(ids.iter().filter_map(|id| records.get(id).cloned()).collect())
    }

    async fn count(&self, query: &RecordQuery) -> Result<usize> {
        let records = self.records.read().await;
        Ok(records.values().filter(|r| query.matches(r)).count())
    }

    async fn filter(&self, query: &RecordQuery, window: Window) -> Result<Vec<Record>> {
        let mut matching: Vec<Record> = {
            let records = self.records.read().await;
            records.values().filter(|r| query.matches(r)).cloned().collect()
        };
        Self::sort(&mut matching, &query.order_by);

        Ok(matching
            .into_iter()
            .skip(window.offset)
            .take(window.limit)
            .collect())
    }

    async fn relations(
        &self,
        subject: &RecordId,
        relation_types: &[RelationTypeId],
    ) -> Result<Vec<Relation>> {
        let relations = self.relations.read().await;
        Ok(relations
            .iter()
            .filter(|rel| &rel.subject == subject)
            .filter(|rel| relation_types.is_empty() || relation_types.contains(&rel.relation_type))
            .cloned()
            .collect())
    }
}
