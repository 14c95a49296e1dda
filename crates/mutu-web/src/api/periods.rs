use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
};
use mutu_core::models::{
    AccreditationPeriod, CriterionSubmission, NewPeriod, PeriodStatus, StatusCounts,
    SubmissionStatus,
};
use mutu_core::service::PeriodSummary;
use uuid::Uuid;

use super::{StatusChange, StatusFilter};
use crate::actor::Actor;
use crate::error::ApiResult;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_periods).post(create_period))
        .route("/statistics", get(statistics))
        .route("/{id}", get(get_period).delete(delete_period))
        .route("/{id}/status", put(change_status))
        .route("/{id}/summary", get(summary))
        .route("/{id}/submissions", get(submissions))
}

async fn list_periods(
    State(state): State<AppState>,
    Query(query): Query<StatusFilter<PeriodStatus>>,
) -> ApiResult<Json<Vec<AccreditationPeriod>>> {
    Ok(Json(state.services.periods.list(query.status).await?))
}

async fn create_period(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Json(req): Json<NewPeriod>,
) -> ApiResult<(StatusCode, Json<AccreditationPeriod>)> {
    let period = state.services.periods.create(req, actor).await?;
    Ok((StatusCode::CREATED, Json(period)))
}

async fn get_period(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<AccreditationPeriod>> {
    Ok(Json(state.services.periods.get(id).await?))
}

async fn delete_period(
    State(state): State<AppState>,
    _actor: Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.services.periods.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn change_status(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<Uuid>,
    Json(req): Json<StatusChange<PeriodStatus>>,
) -> ApiResult<Json<AccreditationPeriod>> {
    let period = state.services.periods.change_status(id, req.status, actor).await?;
    Ok(Json(period))
}

async fn summary(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<PeriodSummary>> {
    Ok(Json(state.services.periods.summary(id).await?))
}

async fn submissions(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<StatusFilter<SubmissionStatus>>,
) -> ApiResult<Json<Vec<CriterionSubmission>>> {
    let submissions = state
        .services
        .submissions
        .list_for_period(id, query.status)
        .await?;
    Ok(Json(submissions))
}

async fn statistics(State(state): State<AppState>) -> ApiResult<Json<StatusCounts>> {
    Ok(Json(state.services.periods.statistics().await?))
}
