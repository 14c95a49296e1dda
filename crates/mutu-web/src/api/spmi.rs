use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
};
use mutu_core::models::{
    IndicatorMonitoring, NewIndicator, NewMonitoring, NewStandard, SpmiIndicator, SpmiStandard,
    StatusCounts,
};
use uuid::Uuid;

use crate::actor::Actor;
use crate::error::ApiResult;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/standards", get(list_standards).post(create_standard))
        .route("/standards/{id}", get(get_standard).delete(delete_standard))
        .route("/standards/{id}/approve", post(approve))
        .route("/standards/{id}/revise", post(revise))
        .route("/standards/{id}/deactivate", post(deactivate))
        .route("/standards/{id}/indicators", get(indicators).post(add_indicator))
        .route("/indicators/{id}", delete(delete_indicator))
        .route(
            "/indicators/{id}/monitorings",
            get(monitorings).post(record_monitoring),
        )
        .route("/attention", get(needing_attention))
        .route("/statistics", get(statistics))
}

async fn list_standards(State(state): State<AppState>) -> ApiResult<Json<Vec<SpmiStandard>>> {
    Ok(Json(state.services.spmi.list_standards().await?))
}

async fn create_standard(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Json(req): Json<NewStandard>,
) -> ApiResult<(StatusCode, Json<SpmiStandard>)> {
    let standard = state.services.spmi.create_standard(req, actor).await?;
    Ok((StatusCode::CREATED, Json(standard)))
}

async fn get_standard(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<SpmiStandard>> {
    Ok(Json(state.services.spmi.get_standard(id).await?))
}

async fn delete_standard(
    State(state): State<AppState>,
    _actor: Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.services.spmi.delete_standard(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn approve(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<SpmiStandard>> {
    Ok(Json(state.services.spmi.approve(id, actor).await?))
}

async fn revise(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<SpmiStandard>> {
    Ok(Json(state.services.spmi.revise(id, actor).await?))
}

async fn deactivate(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<SpmiStandard>> {
    Ok(Json(state.services.spmi.deactivate(id, actor).await?))
}

async fn indicators(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<SpmiIndicator>>> {
    Ok(Json(state.services.spmi.indicators(id).await?))
}

async fn add_indicator(
    State(state): State<AppState>,
    _actor: Actor,
    Path(id): Path<Uuid>,
    Json(req): Json<NewIndicator>,
) -> ApiResult<(StatusCode, Json<SpmiIndicator>)> {
    let indicator = state.services.spmi.add_indicator(id, req).await?;
    Ok((StatusCode::CREATED, Json(indicator)))
}

async fn delete_indicator(
    State(state): State<AppState>,
    _actor: Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.services.spmi.delete_indicator(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn monitorings(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<IndicatorMonitoring>>> {
    Ok(Json(state.services.spmi.monitorings(id).await?))
}

async fn record_monitoring(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<Uuid>,
    Json(req): Json<NewMonitoring>,
) -> ApiResult<(StatusCode, Json<IndicatorMonitoring>)> {
    let monitoring = state.services.spmi.record_monitoring(id, req, actor).await?;
    Ok((StatusCode::CREATED, Json(monitoring)))
}

async fn needing_attention(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<IndicatorMonitoring>>> {
    Ok(Json(state.services.spmi.needing_attention().await?))
}

async fn statistics(State(state): State<AppState>) -> ApiResult<Json<StatusCounts>> {
    Ok(Json(state.services.spmi.statistics().await?))
}
