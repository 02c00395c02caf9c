//! Brick reload handlers
//!
//! Brick ids come from repeated `panel_id` query parameters, a JSON body,
//! or both; query ids come first.

use crate::api::rest::auth::request_context;
use crate::api::rest::state::AppState;
use crate::error::{ApiError, ApiResult};
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::HeaderMap,
    Json,
};
use brick_control::{ReloadRequest, ReloadResponse, ReloadTarget};
use brick_types::{PanelId, RecordId};
use serde::Deserialize;
use serde_json::Value;

/// Reload request body
#[derive(Debug, Default, Deserialize)]
pub struct ReloadBody {
    /// Ids of the bricks to re-render
    #[serde(default, alias = "panel_ids")]
    pub panel_id: Vec<PanelId>,

    /// `{brick id: reloading info}`, as an object or a JSON string
    #[serde(default)]
    pub extra_data: Option<Value>,
}

impl ReloadBody {
    fn from_parts(
        query: Vec<(String, String)>,
        body: Result<Json<ReloadBody>, JsonRejection>,
    ) -> ApiResult<Self> {
        let body = match body {
            Ok(Json(body)) => body,
            // Query-only reloads carry no JSON body.
            Err(JsonRejection::MissingJsonContentType(_)) => ReloadBody::default(),
            Err(rejection) => return Err(ApiError::from(rejection)),
        };

        let mut panel_ids = Vec::new();
        let mut extra_data = None;
        for (key, value) in query {
            match key.as_str() {
                "panel_id" | "panel_ids" => panel_ids.push(PanelId::new(value)),
                "extra_data" => extra_data = Some(Value::String(value)),
                _ => {}
            }
        }
        panel_ids.extend(body.panel_id);

        Ok(Self {
            panel_id: panel_ids,
            extra_data: body.extra_data.or(extra_data),
        })
    }
}

async fn reload(
    state: AppState,
    headers: &HeaderMap,
    target: ReloadTarget,
    body: ReloadBody,
) -> ApiResult<Json<ReloadResponse>> {
    let ctx = request_context(headers)?;
    let mut request = ReloadRequest::new(target, body.panel_id);
    if let Some(extra_data) = body.extra_data {
        request = request.with_extra_data(extra_data);
    }

    let response = state.reload.reload(&ctx, request).await?;
    Ok(Json(response))
}

/// Reload bricks that are not bound to a record
pub async fn reload_basic(
    State(state): State<AppState>,
    Query(query): Query<Vec<(String, String)>>,
    headers: HeaderMap,
    body: Result<Json<ReloadBody>, JsonRejection>,
) -> ApiResult<Json<ReloadResponse>> {
    let body = ReloadBody::from_parts(query, body)?;
    reload(state, &headers, ReloadTarget::Basic, body).await
}

/// Reload bricks of a record's detail page
pub async fn reload_detail(
    State(state): State<AppState>,
    Path(record_id): Path<String>,
    Query(query): Query<Vec<(String, String)>>,
    headers: HeaderMap,
    body: Result<Json<ReloadBody>, JsonRejection>,
) -> ApiResult<Json<ReloadResponse>> {
    let body = ReloadBody::from_parts(query, body)?;
    reload(state, &headers, ReloadTarget::Detail(RecordId::new(record_id)), body).await
}

/// Reload bricks of the home page
pub async fn reload_home(
    State(state): State<AppState>,
    Query(query): Query<Vec<(String, String)>>,
    headers: HeaderMap,
    body: Result<Json<ReloadBody>, JsonRejection>,
) -> ApiResult<Json<ReloadResponse>> {
    let body = ReloadBody::from_parts(query, body)?;
    reload(state, &headers, ReloadTarget::Home, body).await
}

/// Reload bricks of the user's my-page
pub async fn reload_mypage(
    State(state): State<AppState>,
    Query(query): Query<Vec<(String, String)>>,
    headers: HeaderMap,
    body: Result<Json<ReloadBody>, JsonRejection>,
) -> ApiResult<Json<ReloadResponse>> {
    let body = ReloadBody::from_parts(query, body)?;
    reload(state, &headers, ReloadTarget::MyPage, body).await
}
