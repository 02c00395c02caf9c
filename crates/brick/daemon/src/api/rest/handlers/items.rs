//! Config item handlers

use crate::api::rest::auth::request_context;
use crate::api::rest::state::AppState;
use crate::error::ApiResult;
use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use brick_control::{NewCustomItem, NewInstanceItem, NewRelationItem};
use brick_types::{InstanceClassId, PanelId, RecordId, RecordType, RelationTypeId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Create instance brick request
#[derive(Debug, Deserialize)]
pub struct CreateInstanceItemRequest {
    pub class_id: InstanceClassId,
    pub record_id: RecordId,
    #[serde(default)]
    pub extra_data: Map<String, Value>,
}

/// Create relation brick request
#[derive(Debug, Deserialize)]
pub struct CreateRelationItemRequest {
    pub relation_type: RelationTypeId,
    /// Columns per object record type
    #[serde(default)]
    pub cells: BTreeMap<RecordType, Vec<String>>,
}

/// Create custom field group brick request
#[derive(Debug, Deserialize)]
pub struct CreateCustomItemRequest {
    pub record_type: RecordType,
    pub name: String,
    #[serde(default)]
    pub cells: Vec<String>,
}

/// Created brick
#[derive(Debug, Serialize)]
pub struct CreatedItemResponse {
    pub panel_id: PanelId,
}

/// Deleted brick config
#[derive(Debug, Serialize)]
pub struct DeletedItemResponse {
    pub id: Uuid,
    pub deleted: bool,
}

pub async fn create_instance_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateInstanceItemRequest>,
) -> ApiResult<Json<CreatedItemResponse>> {
    let ctx = request_context(&headers)?;
    let panel_id = state
        .config
        .create_instance_item(
            &ctx,
            NewInstanceItem {
                class_id: request.class_id,
                record_id: request.record_id,
                extra_data: request.extra_data,
            },
        )
        .await?;
    Ok(Json(CreatedItemResponse { panel_id }))
}

pub async fn create_relation_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateRelationItemRequest>,
) -> ApiResult<Json<CreatedItemResponse>> {
    let ctx = request_context(&headers)?;
    let panel_id = state
        .config
        .create_relation_item(
            &ctx,
            NewRelationItem {
                relation_type: request.relation_type,
                cells: request.cells,
            },
        )
        .await?;
    Ok(Json(CreatedItemResponse { panel_id }))
}

pub async fn create_custom_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateCustomItemRequest>,
) -> ApiResult<Json<CreatedItemResponse>> {
    let ctx = request_context(&headers)?;
    let panel_id = state
        .config
        .create_custom_item(
            &ctx,
            NewCustomItem {
                record_type: request.record_type,
                name: request.name,
                cells: request.cells,
            },
        )
        .await?;
    Ok(Json(CreatedItemResponse { panel_id }))
}

pub async fn delete_instance_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> ApiResult<Json<DeletedItemResponse>> {
    let ctx = request_context(&headers)?;
    state.config.delete_instance_item(&ctx, id).await?;
    Ok(Json(DeletedItemResponse { id, deleted: true }))
}

pub async fn delete_relation_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> ApiResult<Json<DeletedItemResponse>> {
    let ctx = request_context(&headers)?;
    state.config.delete_relation_item(&ctx, id).await?;
    Ok(Json(DeletedItemResponse { id, deleted: true }))
}

pub async fn delete_custom_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> ApiResult<Json<DeletedItemResponse>> {
    let ctx = request_context(&headers)?;
    state.config.delete_custom_item(&ctx, id).await?;
    Ok(Json(DeletedItemResponse { id, deleted: true }))
}
