use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
};
use mutu_core::models::{NewRtl, Rtl, RtlStatus, VerificationOutcome};
use mutu_core::service::RtlStatistics;
use serde::Deserialize;
use uuid::Uuid;

use super::StatusFilter;
use crate::actor::Actor;
use crate::error::ApiResult;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_rtls).post(create_rtl))
        .route("/statistics", get(statistics))
        .route("/{id}", get(get_rtl).delete(delete_rtl))
        .route("/{id}/start", post(start))
        .route("/{id}/progress", put(update_progress))
        .route("/{id}/complete", post(complete))
        .route("/{id}/verify", post(verify))
}

#[derive(Debug, Deserialize)]
pub struct ProgressRequest {
    percentage: f64,
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    outcome: VerificationOutcome,
    notes: Option<String>,
}

async fn list_rtls(
    State(state): State<AppState>,
    Query(query): Query<StatusFilter<RtlStatus>>,
) -> ApiResult<Json<Vec<Rtl>>> {
    Ok(Json(state.services.rtls.list(query.status).await?))
}

async fn create_rtl(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Json(req): Json<NewRtl>,
) -> ApiResult<(StatusCode, Json<Rtl>)> {
    let rtl = state.services.rtls.create(req, actor).await?;
    Ok((StatusCode::CREATED, Json(rtl)))
}

async fn get_rtl(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<Rtl>> {
    Ok(Json(state.services.rtls.get(id).await?))
}

async fn delete_rtl(
    State(state): State<AppState>,
    _actor: Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.services.rtls.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn start(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Rtl>> {
    Ok(Json(state.services.rtls.start(id, actor).await?))
}

async fn update_progress(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<Uuid>,
    Json(req): Json<ProgressRequest>,
) -> ApiResult<Json<Rtl>> {
    let rtl = state
        .services
        .rtls
        .update_progress(id, req.percentage, actor)
        .await?;
    Ok(Json(rtl))
}

async fn complete(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Rtl>> {
    Ok(Json(state.services.rtls.complete(id, actor).await?))
}

async fn verify(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<Uuid>,
    Json(req): Json<VerifyRequest>,
) -> ApiResult<Json<Rtl>> {
    let rtl = state
        .services
        .rtls
        .verify(id, req.outcome, req.notes, actor)
        .await?;
    Ok(Json(rtl))
}

async fn statistics(State(state): State<AppState>) -> ApiResult<Json<RtlStatistics>> {
    Ok(Json(state.services.rtls.statistics().await?))
}
