//! Brick state handler

use crate::api::rest::auth::request_context;
use crate::api::rest::state::AppState;
use crate::error::{ApiError, ApiResult};
use axum::{extract::State, http::HeaderMap, Json};
use brick_types::{PanelId, PanelState, StateFields};
use serde_json::{Map, Value};

/// Update the requesting user's state of one brick.
///
/// Only `is_open` and `show_empty_fields` are settable; other keys are
/// ignored. Persistence is best effort and never fails the request.
pub async fn set_brick_state(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<Map<String, Value>>,
) -> ApiResult<Json<PanelState>> {
    let ctx = request_context(&headers)?;
    let panel_id = match body.get("panel_id") {
        Some(Value::String(id)) if !id.trim().is_empty() => PanelId::new(id.trim()),
        _ => return Err(ApiError::BadRequest("Missing panel_id".to_string())),
    };

    let fields = StateFields::from_client(&body);
    if fields.is_empty() {
        return Ok(Json(state.states.get(&ctx.user.id, &panel_id).await?));
    }

    let updated = state.states.set_fields(&ctx.user.id, &panel_id, &fields).await;
    tracing::debug!(request_id = %ctx.request_id, panel_id = %panel_id, "Updated brick state");
    Ok(Json(updated))
}
