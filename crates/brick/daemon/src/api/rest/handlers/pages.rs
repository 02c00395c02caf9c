//! Page view handlers

use crate::api::rest::auth::request_context;
use crate::api::rest::state::AppState;
use crate::error::ApiResult;
use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use brick_control::{DetailPage, PanelPage};
use brick_types::RecordId;

/// Detail page of a record
pub async fn detail_page(
    State(state): State<AppState>,
    Path(record_id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Json<DetailPage>> {
    let ctx = request_context(&headers)?;
    Ok(Json(state.pages.detail_page(&ctx, &RecordId::new(record_id)).await?))
}

/// Home page
pub async fn home_page(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Json<PanelPage>> {
    let ctx = request_context(&headers)?;
    Ok(Json(state.pages.home_page(&ctx).await?))
}

/// The user's my-page
pub async fn my_page(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Json<PanelPage>> {
    let ctx = request_context(&headers)?;
    Ok(Json(state.pages.my_page(&ctx).await?))
}
