use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::put,
};
use mutu_core::form::DataRow;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::actor::Actor;
use crate::error::ApiResult;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/{id}", put(update_row).delete(delete_row))
}

/// Body is a field-name keyed object; unnamed fields keep their values.
async fn update_row(
    State(state): State<AppState>,
    _actor: Actor,
    Path(id): Path<Uuid>,
    Json(values): Json<Map<String, Value>>,
) -> ApiResult<Json<DataRow>> {
    Ok(Json(state.services.data.update(id, &values).await?))
}

async fn delete_row(
    State(state): State<AppState>,
    _actor: Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.services.data.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
