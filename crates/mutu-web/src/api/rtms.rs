use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post, put},
};
use mutu_core::models::{ActionItem, NewActionItem, NewRtm, Rtm, RtmStatus};
use mutu_core::service::{RtmOutcome, RtmStatistics};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::StatusFilter;
use crate::actor::Actor;
use crate::error::ApiResult;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_rtms).post(create_rtm))
        .route("/statistics", get(statistics))
        .route("/{id}", get(get_rtm).delete(delete_rtm))
        .route("/{id}/start", post(start))
        .route("/{id}/complete", post(complete))
        .route("/{id}/cancel", post(cancel))
        .route("/{id}/progress", get(progress))
        .route("/{id}/actions", get(actions).post(add_action))
        .route("/actions/{id}", delete(delete_action))
        .route("/actions/{id}/start", post(start_action))
        .route("/actions/{id}/complete", post(complete_action))
        .route("/actions/{id}/cancel", post(cancel_action))
        .route("/actions/{id}/progress", put(update_action_progress))
}

#[derive(Debug, Deserialize)]
pub struct ProgressRequest {
    percentage: f64,
}

#[derive(Debug, Serialize)]
pub struct ProgressResponse {
    rtm_id: Uuid,
    percentage: f64,
}

async fn list_rtms(
    State(state): State<AppState>,
    Query(query): Query<StatusFilter<RtmStatus>>,
) -> ApiResult<Json<Vec<Rtm>>> {
    Ok(Json(state.services.rtms.list(query.status).await?))
}

async fn create_rtm(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Json(req): Json<NewRtm>,
) -> ApiResult<(StatusCode, Json<Rtm>)> {
    let rtm = state.services.rtms.create(req, actor).await?;
    Ok((StatusCode::CREATED, Json(rtm)))
}

async fn get_rtm(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<Rtm>> {
    Ok(Json(state.services.rtms.get(id).await?))
}

async fn delete_rtm(
    State(state): State<AppState>,
    _actor: Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.services.rtms.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn start(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Rtm>> {
    Ok(Json(state.services.rtms.start(id, actor).await?))
}

async fn complete(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<Uuid>,
    Json(req): Json<RtmOutcome>,
) -> ApiResult<Json<Rtm>> {
    Ok(Json(state.services.rtms.complete(id, req, actor).await?))
}

async fn cancel(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Rtm>> {
    Ok(Json(state.services.rtms.cancel(id, actor).await?))
}

async fn progress(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ProgressResponse>> {
    let percentage = state.services.rtms.progress(id).await?;
    Ok(Json(ProgressResponse {
        rtm_id: id,
        percentage,
    }))
}

async fn statistics(State(state): State<AppState>) -> ApiResult<Json<RtmStatistics>> {
    Ok(Json(state.services.rtms.statistics().await?))
}

// Action items

async fn actions(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<ActionItem>>> {
    Ok(Json(state.services.rtms.actions(id).await?))
}

async fn add_action(
    State(state): State<AppState>,
    _actor: Actor,
    Path(id): Path<Uuid>,
    Json(req): Json<NewActionItem>,
) -> ApiResult<(StatusCode, Json<ActionItem>)> {
    let item = state.services.rtms.add_action(id, req).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

async fn start_action(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ActionItem>> {
    Ok(Json(state.services.rtms.start_action(id, actor).await?))
}

async fn complete_action(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ActionItem>> {
    Ok(Json(state.services.rtms.complete_action(id, actor).await?))
}

async fn cancel_action(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ActionItem>> {
    Ok(Json(state.services.rtms.cancel_action(id, actor).await?))
}

async fn update_action_progress(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<Uuid>,
    Json(req): Json<ProgressRequest>,
) -> ApiResult<Json<ActionItem>> {
    let item = state
        .services
        .rtms
        .update_action_progress(id, req.percentage, actor)
        .await?;
    Ok(Json(item))
}

async fn delete_action(
    State(state): State<AppState>,
    _actor: Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.services.rtms.delete_action(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
