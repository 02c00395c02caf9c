//! Placement configuration handlers

use crate::api::rest::auth::request_context;
use crate::api::rest::state::AppState;
use crate::error::{ApiError, ApiResult};
use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::HeaderMap,
    Json,
};
use brick_control::{DetailLayoutView, FieldErrorCode, FieldErrors, PanelListView, LAYOUT_FIELD};
use brick_types::{Audience, PanelId, RecordType, ZoneLayout};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Layer selection of the detail configuration endpoints
#[derive(Debug, Default, Deserialize)]
pub struct DetailLayerQuery {
    /// Record type; absent for the layers shared by every type
    pub record_type: Option<String>,
    pub role: Option<String>,
    #[serde(default)]
    pub superuser: bool,
}

impl DetailLayerQuery {
    fn record_type(&self) -> Option<RecordType> {
        self.record_type
            .as_deref()
            .map(str::trim)
            .filter(|rt| !rt.is_empty())
            .map(RecordType::new)
    }

    fn audience(&self) -> ApiResult<Audience> {
        audience(self.role.as_deref(), self.superuser)
    }
}

/// Audience selection: a role, superusers, or the default audience
#[derive(Debug, Default, Deserialize)]
pub struct AudienceQuery {
    pub role: Option<String>,
    #[serde(default)]
    pub superuser: bool,
}

impl AudienceQuery {
    fn audience(&self) -> ApiResult<Audience> {
        audience(self.role.as_deref(), self.superuser)
    }
}

fn audience(role: Option<&str>, superuser: bool) -> ApiResult<Audience> {
    match (role.map(str::trim).filter(|r| !r.is_empty()), superuser) {
        (Some(_), true) => Err(ApiError::BadRequest(
            "role and superuser are mutually exclusive".to_string(),
        )),
        (None, true) => Ok(Audience::Superuser),
        (Some(role), false) => Ok(Audience::Role(role.into())),
        (None, false) => Ok(Audience::Default),
    }
}

/// My-page selection
#[derive(Debug, Default, Deserialize)]
pub struct MyPageQuery {
    /// Configure the default my-page instead of the user's own
    #[serde(default)]
    pub default: bool,
}

/// Deletion response
#[derive(Debug, Serialize)]
pub struct RemovedResponse {
    pub removed: usize,
}

/// The form may wrap the layout in a `bricks` field.
fn layout_input(body: &Value) -> &Value {
    body.get(LAYOUT_FIELD).unwrap_or(body)
}

/// Unparseable JSON is a field error of the layout, like a malformed
/// `bricks` string.
fn layout_body(body: Result<Json<Value>, JsonRejection>) -> ApiResult<Value> {
    match body {
        Ok(Json(body)) => Ok(body),
        Err(JsonRejection::JsonSyntaxError(err)) => Err(ApiError::Validation(FieldErrors::single(
            LAYOUT_FIELD,
            FieldErrorCode::MalformedJson,
            err.body_text(),
        ))),
        Err(rejection) => Err(rejection.into()),
    }
}

/// Get a detail layer, or what it falls back to
pub async fn get_detail_config(
    State(state): State<AppState>,
    Query(query): Query<DetailLayerQuery>,
    headers: HeaderMap,
) -> ApiResult<Json<DetailLayoutView>> {
    let ctx = request_context(&headers)?;
    let view = state
        .config
        .detail_layout(&ctx, query.record_type().as_ref(), &query.audience()?)
        .await?;
    Ok(Json(view))
}

/// Replace a detail layer
pub async fn put_detail_config(
    State(state): State<AppState>,
    Query(query): Query<DetailLayerQuery>,
    headers: HeaderMap,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<ZoneLayout>> {
    let ctx = request_context(&headers)?;
    let body = layout_body(body)?;
    let layout = state
        .config
        .set_detail_layout(
            &ctx,
            query.record_type().as_ref(),
            &query.audience()?,
            layout_input(&body),
        )
        .await?;
    Ok(Json(layout))
}

/// Delete a detail layer
pub async fn delete_detail_config(
    State(state): State<AppState>,
    Query(query): Query<DetailLayerQuery>,
    headers: HeaderMap,
) -> ApiResult<Json<RemovedResponse>> {
    let ctx = request_context(&headers)?;
    let removed = state
        .config
        .delete_detail_layout(&ctx, query.record_type().as_ref(), &query.audience()?)
        .await?;
    Ok(Json(RemovedResponse { removed }))
}

/// Get a home layer
pub async fn get_home_config(
    State(state): State<AppState>,
    Query(query): Query<AudienceQuery>,
    headers: HeaderMap,
) -> ApiResult<Json<PanelListView>> {
    let ctx = request_context(&headers)?;
    Ok(Json(state.config.home_layout(&ctx, &query.audience()?).await?))
}

/// Replace a home layer
pub async fn put_home_config(
    State(state): State<AppState>,
    Query(query): Query<AudienceQuery>,
    headers: HeaderMap,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<Vec<PanelId>>> {
    let ctx = request_context(&headers)?;
    let body = layout_body(body)?;
    let ids = state
        .config
        .set_home_layout(&ctx, &query.audience()?, layout_input(&body))
        .await?;
    Ok(Json(ids))
}

/// Delete a home layer
pub async fn delete_home_config(
    State(state): State<AppState>,
    Query(query): Query<AudienceQuery>,
    headers: HeaderMap,
) -> ApiResult<Json<RemovedResponse>> {
    let ctx = request_context(&headers)?;
    let removed = state
        .config
        .delete_home_layout(&ctx, &query.audience()?)
        .await?;
    Ok(Json(RemovedResponse { removed }))
}

/// Get the user's my-page list
pub async fn get_mypage_config(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<PanelListView>> {
    let ctx = request_context(&headers)?;
    Ok(Json(state.config.mypage_layout(&ctx).await?))
}

/// Replace the user's (or the default) my-page list
pub async fn put_mypage_config(
    State(state): State<AppState>,
    Query(query): Query<MyPageQuery>,
    headers: HeaderMap,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<Vec<PanelId>>> {
    let ctx = request_context(&headers)?;
    let body = layout_body(body)?;
    let ids = state
        .config
        .set_mypage_layout(&ctx, query.default, layout_input(&body))
        .await?;
    Ok(Json(ids))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_audience_query() {
        let query = |role: Option<&str>, superuser| AudienceQuery {
            role: role.map(String::from),
            superuser,
        };

        assert_eq!(query(None, false).audience().unwrap(), Audience::Default);
        assert_eq!(query(Some(""), false).audience().unwrap(), Audience::Default);
        assert_eq!(query(None, true).audience().unwrap(), Audience::Superuser);
        assert_eq!(
            query(Some("sales"), false).audience().unwrap(),
            Audience::Role("sales".into())
        );
        assert!(query(Some("sales"), true).audience().is_err());
    }

    #[test]
    fn test_layout_input_unwraps_form_field() {
        let wrapped = json!({"bricks": {"top": ["model"]}});
        assert_eq!(layout_input(&wrapped), &json!({"top": ["model"]}));

        let bare = json!({"top": ["model"]});
        assert_eq!(layout_input(&bare), &bare);
    }
}
