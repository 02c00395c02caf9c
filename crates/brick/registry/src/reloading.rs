//! Reloading info
//!
//! Clients send, per brick, an opaque JSON object describing the view they
//! want back (page number, sort column, relation filters). Each variant
//! validates the keys it understands; a wrongly shaped value is reported and
//! the brick renders with its defaults.

use crate::panel::{ListSource, Panel, PanelBody};
use crate::source::OrderBy;
use brick_types::{PanelKind, RelationTypeId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::warn;

/// Validated view parameters of one brick
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReloadingInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_by: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<RelationTypeId>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<RelationTypeId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReloadingInfoError {
    #[error("reloading info must be a JSON object")]
    NotAnObject,

    #[error("invalid page number: {0}")]
    InvalidPage(String),

    #[error("invalid order: {0}")]
    InvalidOrder(String),

    #[error("invalid relation type filter: {0}")]
    InvalidFilter(String),

    #[error("{0} bricks take no reloading info")]
    NotReloadable(PanelKind),
}

impl ReloadingInfo {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Object form, as stored in the brick state's extra data.
    pub fn to_extra_data(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }

    /// Restore from a brick state's extra data. Anything unreadable yields
    /// the defaults.
    pub fn from_extra_data(data: &Map<String, Value>) -> Self {
        serde_json::from_value(Value::Object(data.clone())).unwrap_or_default()
    }
}

fn parse_page(obj: &Map<String, Value>) -> Result<Option<usize>, ReloadingInfoError> {
    match obj.get("page") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => match n.as_u64() {
            Some(page) if page >= 1 => Ok(Some(page as usize)),
            _ => Err(ReloadingInfoError::InvalidPage(n.to_string())),
        },
        Some(Value::String(s)) => match s.trim().parse::<usize>() {
            Ok(page) if page >= 1 => Ok(Some(page)),
            _ => Err(ReloadingInfoError::InvalidPage(s.clone())),
        },
        Some(other) => Err(ReloadingInfoError::InvalidPage(other.to_string())),
    }
}

fn parse_types(obj: &Map<String, Value>, key: &str) -> Result<Vec<RelationTypeId>, ReloadingInfoError> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) if !s.is_empty() => Ok(RelationTypeId::new(s.clone())),
                other => Err(ReloadingInfoError::InvalidFilter(other.to_string())),
            })
            .collect(),
        Some(other) => Err(ReloadingInfoError::InvalidFilter(other.to_string())),
    }
}

impl Panel {
    /// Validate client-supplied reloading info for this brick.
    pub fn parse_reloading_info(&self, value: &Value) -> Result<ReloadingInfo, ReloadingInfoError> {
        let obj = value.as_object().ok_or(ReloadingInfoError::NotAnObject)?;

        match self.body() {
            PanelBody::Paginated(p) => {
                let mut info = ReloadingInfo {
                    page: parse_page(obj)?,
                    ..Default::default()
                };
                if let ListSource::Relations { .. } = p.source {
                    info.include = parse_types(obj, "include")?;
                    info.exclude = parse_types(obj, "exclude")?;
                }
                Ok(info)
            }
            PanelBody::Queryset(q) => {
                let order_by = match obj.get("order_by") {
                    None | Some(Value::Null) => None,
                    Some(Value::String(raw)) => match OrderBy::parse(raw) {
                        Some(order) if q.is_sortable(&order) => Some(order.to_string()),
                        _ => {
                            warn!(panel_id = %self.id(), order_by = %raw, "Unknown sort column, using default order");
                            None
                        }
                    },
                    Some(other) => return Err(ReloadingInfoError::InvalidOrder(other.to_string())),
                };
                Ok(ReloadingInfo {
                    page: parse_page(obj)?,
                    order_by,
                    ..Default::default()
                })
            }
            PanelBody::Relation(_) => Ok(ReloadingInfo {
                page: parse_page(obj)?,
                ..Default::default()
            }),
            _ => Err(ReloadingInfoError::NotReloadable(self.kind())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::panel::Templates;
    use crate::source::RecordQuery;
    use brick_types::PanelDescriptor;
    use serde_json::json;

    fn queryset() -> Panel {
        Panel::queryset(
            PanelDescriptor::new("billing-invoices", PanelKind::QuerysetBacked),
            RecordQuery::new("billing.invoice").ordered_by(OrderBy::asc("number")),
            vec!["number".into(), "amount".into()],
            Templates::detail("billing/bricks/invoices.html"),
        )
    }

    fn relations() -> Panel {
        Panel::paginated(
            PanelDescriptor::new("core-relations", PanelKind::Paginated),
            ListSource::Relations {
                relation_types: Vec::new(),
            },
            Templates::detail("core/bricks/relations.html"),
        )
    }

    #[test]
    fn test_paginated_info() {
        let info = relations()
            .parse_reloading_info(&json!({"page": 3, "exclude": ["employs"]}))
            .unwrap();
        assert_eq!(info.page, Some(3));
        assert_eq!(info.exclude, vec![RelationTypeId::new("employs")]);

        let info = relations()
            .parse_reloading_info(&json!({"page": "2"}))
            .unwrap();
        assert_eq!(info.page, Some(2));
    }

    #[test]
    fn test_wrong_shapes_are_rejected() {
        let panel = relations();
        assert_eq!(
            panel.parse_reloading_info(&json!([1, 2])),
            Err(ReloadingInfoError::NotAnObject)
        );
        assert!(matches!(
            panel.parse_reloading_info(&json!({"page": 0})),
            Err(ReloadingInfoError::InvalidPage(_))
        ));
        assert!(matches!(
            panel.parse_reloading_info(&json!({"include": "employs"})),
            Err(ReloadingInfoError::InvalidFilter(_))
        ));
    }

    #[test]
    fn test_queryset_unknown_order_falls_back() {
        let panel = queryset();
        let info = panel
            .parse_reloading_info(&json!({"order_by": "-amount"}))
            .unwrap();
        assert_eq!(info.order_by.as_deref(), Some("-amount"));

        let info = panel
            .parse_reloading_info(&json!({"order_by": "password", "page": 2}))
            .unwrap();
        assert_eq!(info.order_by, None);
        assert_eq!(info.page, Some(2));

        assert!(matches!(
            panel.parse_reloading_info(&json!({"order_by": 12})),
            Err(ReloadingInfoError::InvalidOrder(_))
        ));
    }

    #[test]
    fn test_simple_bricks_take_no_info() {
        let panel = Panel::simple(
            PanelDescriptor::new("persons-card", PanelKind::Simple),
            Templates::detail("card.html"),
        );
        assert_eq!(
            panel.parse_reloading_info(&json!({})),
            Err(ReloadingInfoError::NotReloadable(PanelKind::Simple))
        );
    }

    #[test]
    fn test_extra_data_round_trip_skips_absent_keys() {
        let info = ReloadingInfo {
            page: Some(2),
            ..Default::default()
        };
        let data = info.to_extra_data();
        assert_eq!(data.len(), 1);
        assert_eq!(ReloadingInfo::from_extra_data(&data), info);
    }
}
