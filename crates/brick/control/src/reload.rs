//! Reload protocol
//!
//! A reload re-renders a subset of a page's bricks and returns
//! `(id, fragment)` pairs in request order. The handler is stateless: what a
//! brick should look like comes from the request and the stored brick
//! states.

use crate::context::RequestContext;
use crate::error::{ControlError, Result};
use crate::rendering::{PanelRenderer, RenderPass};
use brick_registry::Surface;
use brick_types::{PanelId, Record, RecordId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tracing::{info, instrument, warn};

/// Where the reloaded bricks are displayed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "record_id", rename_all = "snake_case")]
pub enum ReloadTarget {
    /// Bricks not bound to a record
    Basic,
    /// Bricks of a record's detail page
    Detail(RecordId),
    Home,
    MyPage,
}

impl ReloadTarget {
    pub fn surface(&self) -> Surface {
        match self {
            ReloadTarget::Basic | ReloadTarget::Detail(_) => Surface::Detail,
            ReloadTarget::Home => Surface::Home,
            ReloadTarget::MyPage => Surface::MyPage,
        }
    }
}

/// A reload request
#[derive(Debug, Clone, PartialEq)]
pub struct ReloadRequest {
    pub panel_ids: Vec<PanelId>,
    /// `{brick id: reloading info}`; a JSON string is parsed first
    pub extra_data: Option<Value>,
    pub target: ReloadTarget,
}

impl ReloadRequest {
    pub fn new(target: ReloadTarget, panel_ids: Vec<PanelId>) -> Self {
        Self {
            panel_ids,
            extra_data: None,
            target,
        }
    }

    pub fn with_extra_data(mut self, extra_data: Value) -> Self {
        self.extra_data = Some(extra_data);
        self
    }
}

/// Reload response: `[[id, fragment], ...]`
pub type ReloadResponse = Vec<(PanelId, String)>;

/// Reload handler configuration
#[derive(Debug, Clone)]
pub struct ReloadConfig {
    /// Save valid reloading info into the brick states
    pub persist_reloading_info: bool,
}

impl Default for ReloadConfig {
    fn default() -> Self {
        Self {
            persist_reloading_info: true,
        }
    }
}

/// Parse the per-brick reloading info. Anything malformed is logged and
/// dropped; the request goes on.
pub fn parse_extra_data(extra_data: Option<&Value>) -> HashMap<PanelId, Value> {
    let parsed;
    let value = match extra_data {
        None | Some(Value::Null) => return HashMap::new(),
        Some(Value::String(raw)) if raw.trim().is_empty() => return HashMap::new(),
        Some(Value::String(raw)) => match serde_json::from_str::<Value>(raw) {
            Ok(value) => {
                parsed = value;
                &parsed
            }
            Err(e) => {
                warn!(error = %e, "Malformed reloading info JSON, ignored");
                return HashMap::new();
            }
        },
        Some(value) => value,
    };

    match value {
        Value::Object(map) => map
            .iter()
            .map(|(id, info)| (PanelId::new(id.clone()), info.clone()))
            .collect(),
        other => {
            warn!(kind = json_kind(other), "Reloading info must be an object, ignored");
            HashMap::new()
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Reload protocol handler
#[derive(Clone)]
pub struct ReloadHandler {
    renderer: PanelRenderer,
}

impl ReloadHandler {
    pub fn new(renderer: PanelRenderer, config: ReloadConfig) -> Self {
        Self {
            renderer: renderer.with_persisted_reloading_info(config.persist_reloading_info),
        }
    }

    /// Host record of a detail reload. Missing or invisible records abort
    /// the request.
    async fn host_record(&self, ctx: &RequestContext, record_id: &RecordId) -> Result<Record> {
        let factory = self.renderer.factory();
        let record = factory
            .records()
            .get(record_id)
            .await?
            .ok_or_else(|| ControlError::RecordNotFound(record_id.clone()))?;

        if !factory.permissions().can_view(&ctx.user, &record)? {
            return Err(ControlError::forbidden(format!(
                "cannot view {}",
                record.id
            )));
        }
        Ok(record)
    }

    /// Re-render the requested bricks.
    ///
    /// Unknown ids are left out of the response. Zero ids is a client error.
    #[instrument(skip(self, ctx, request), fields(request_id = %ctx.request_id, bricks = request.panel_ids.len()))]
    pub async fn reload(&self, ctx: &RequestContext, request: ReloadRequest) -> Result<ReloadResponse> {
        if request.panel_ids.is_empty() {
            return Err(ControlError::EmptyRequest);
        }

        let mut seen = HashSet::new();
        let ids: Vec<PanelId> = request
            .panel_ids
            .into_iter()
            .filter(|id| seen.insert(id.clone()))
            .collect();

        let record = match &request.target {
            ReloadTarget::Detail(record_id) => Some(self.host_record(ctx, record_id).await?),
            _ => None,
        };
        let reloading = parse_extra_data(request.extra_data.as_ref());

        let (_, rendered) = self
            .renderer
            .render(RenderPass {
                ids: &ids,
                record: record.as_ref(),
                surface: request.target.surface(),
                user: &ctx.user,
                reloading: &reloading,
                page_panel_ids: &ids,
            })
            .await;

        info!(requested = ids.len(), rendered = rendered.len(), "Reloaded bricks");
        Ok(rendered.into_iter().map(|r| (r.id, r.html)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extra_data_forms() {
        let from_value = parse_extra_data(Some(&json!({"a": {"page": 2}})));
        assert_eq!(from_value[&PanelId::new("a")], json!({"page": 2}));

        let from_string = parse_extra_data(Some(&json!(r#"{"a": {"page": 3}}"#)));
        assert_eq!(from_string[&PanelId::new("a")], json!({"page": 3}));

        assert!(parse_extra_data(Some(&json!("{not json"))).is_empty());
        assert!(parse_extra_data(Some(&json!([1, 2]))).is_empty());
        assert!(parse_extra_data(Some(&json!(""))).is_empty());
        assert!(parse_extra_data(None).is_empty());
    }

    #[test]
    fn test_target_surfaces() {
        assert_eq!(ReloadTarget::Basic.surface(), Surface::Detail);
        assert_eq!(ReloadTarget::Detail("c1".into()).surface(), Surface::Detail);
        assert_eq!(ReloadTarget::MyPage.surface(), Surface::MyPage);
    }
}
