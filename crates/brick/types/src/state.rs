//! Per-user brick UI state

use crate::{PanelId, UserId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Persisted UI state of one brick for one user.
///
/// At most one row exists per (user, brick); rows are created lazily on the
/// first state change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelState {
    pub user_id: UserId,
    pub panel_id: PanelId,
    pub is_open: bool,
    pub show_empty_fields: bool,
    /// Opaque per-brick data; holds the last reloading info
    #[serde(default)]
    pub extra_data: Map<String, Value>,
}

impl PanelState {
    /// Default-valued state, not persisted.
    pub fn new(user_id: UserId, panel_id: PanelId) -> Self {
        Self {
            user_id,
            panel_id,
            is_open: true,
            show_empty_fields: true,
            extra_data: Map::new(),
        }
    }
}

/// Partial update of a [`PanelState`]. Absent fields stay unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateFields {
    pub is_open: Option<bool>,
    pub show_empty_fields: Option<bool>,
    pub extra_data: Option<Map<String, Value>>,
}

impl StateFields {
    /// Allow-listed boolean fields settable by clients.
    pub const CLIENT_FIELDS: [&'static str; 2] = ["is_open", "show_empty_fields"];

    /// Extract the allow-listed fields from a client payload.
    ///
    /// Unknown keys and non-boolean values are ignored.
    pub fn from_client(payload: &Map<String, Value>) -> Self {
        let flag = |key: &str| payload.get(key).and_then(Value::as_bool);

        Self {
            is_open: flag("is_open"),
            show_empty_fields: flag("show_empty_fields"),
            extra_data: None,
        }
    }

    pub fn extra_data(data: Map<String, Value>) -> Self {
        Self {
            extra_data: Some(data),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.is_open.is_none() && self.show_empty_fields.is_none() && self.extra_data.is_none()
    }

    /// Apply onto a state; returns whether anything changed.
    pub fn apply(&self, state: &mut PanelState) -> bool {
        let mut changed = false;

        if let Some(is_open) = self.is_open {
            changed |= state.is_open != is_open;
            state.is_open = is_open;
        }
        if let Some(show) = self.show_empty_fields {
            changed |= state.show_empty_fields != show;
            state.show_empty_fields = show;
        }
        if let Some(extra) = &self.extra_data {
            changed |= &state.extra_data != extra;
            state.extra_data = extra.clone();
        }

        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn state() -> PanelState {
        PanelState::new(UserId::new("u1"), PanelId::new("persons-card"))
    }

    #[test]
    fn test_from_client_ignores_unknown_fields() {
        let payload = json!({
            "is_open": false,
            "show_empty_fields": "yes",
            "is_admin": true,
        });
        let fields = StateFields::from_client(payload.as_object().unwrap());

        assert_eq!(fields.is_open, Some(false));
        assert_eq!(fields.show_empty_fields, None);
        assert!(fields.extra_data.is_none());
    }

    #[test]
    fn test_apply_reports_change() {
        let mut s = state();
        let fields = StateFields {
            is_open: Some(true),
            ..Default::default()
        };
        assert!(!fields.apply(&mut s));

        let fields = StateFields {
            is_open: Some(false),
            ..Default::default()
        };
        assert!(fields.apply(&mut s));
        assert!(!s.is_open);
        assert!(s.show_empty_fields);
    }

    #[test]
    fn test_apply_extra_data() {
        let mut s = state();
        let data = json!({"page": 2}).as_object().unwrap().clone();

        assert!(StateFields::extra_data(data.clone()).apply(&mut s));
        assert_eq!(s.extra_data, data);
        assert!(!StateFields::extra_data(data).apply(&mut s));
    }
}
