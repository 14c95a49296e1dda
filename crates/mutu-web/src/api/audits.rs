use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
};
use mutu_core::models::{
    AuditFinding, AuditPlan, AuditPlanStatus, AuditSchedule, FindingStatus, NewAuditFinding,
    NewAuditPlan, NewAuditSchedule, ScheduleStatus,
};
use mutu_core::service::AuditStatistics;
use serde::Deserialize;
use uuid::Uuid;

use super::{StatusChange, StatusFilter};
use crate::actor::Actor;
use crate::error::ApiResult;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/plans", get(list_plans).post(create_plan))
        .route("/plans/{id}", get(get_plan))
        .route("/plans/{id}/status", put(change_plan_status))
        .route("/plans/{id}/schedules", get(schedules).post(add_schedule))
        .route("/schedules/{id}/status", put(change_schedule_status))
        .route("/findings", get(list_findings).post(create_finding))
        .route("/findings/{id}", get(get_finding).delete(delete_finding))
        .route("/findings/{id}/status", put(change_finding_status))
        .route("/statistics", get(statistics))
}

#[derive(Debug, Deserialize)]
pub struct FindingStatusChange {
    status: FindingStatus,
    resolution_notes: Option<String>,
}

// Plans

async fn list_plans(State(state): State<AppState>) -> ApiResult<Json<Vec<AuditPlan>>> {
    Ok(Json(state.services.audits.list_plans().await?))
}

async fn create_plan(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Json(req): Json<NewAuditPlan>,
) -> ApiResult<(StatusCode, Json<AuditPlan>)> {
    let plan = state.services.audits.create_plan(req, actor).await?;
    Ok((StatusCode::CREATED, Json(plan)))
}

async fn get_plan(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<AuditPlan>> {
    Ok(Json(state.services.audits.get_plan(id).await?))
}

async fn change_plan_status(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<Uuid>,
    Json(req): Json<StatusChange<AuditPlanStatus>>,
) -> ApiResult<Json<AuditPlan>> {
    let plan = state
        .services
        .audits
        .change_plan_status(id, req.status, actor)
        .await?;
    Ok(Json(plan))
}

async fn schedules(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<AuditSchedule>>> {
    Ok(Json(state.services.audits.schedules(id).await?))
}

async fn add_schedule(
    State(state): State<AppState>,
    _actor: Actor,
    Path(id): Path<Uuid>,
    Json(req): Json<NewAuditSchedule>,
) -> ApiResult<(StatusCode, Json<AuditSchedule>)> {
    let schedule = state.services.audits.add_schedule(id, req).await?;
    Ok((StatusCode::CREATED, Json(schedule)))
}

async fn change_schedule_status(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<Uuid>,
    Json(req): Json<StatusChange<ScheduleStatus>>,
) -> ApiResult<Json<AuditSchedule>> {
    let schedule = state
        .services
        .audits
        .change_schedule_status(id, req.status, actor)
        .await?;
    Ok(Json(schedule))
}

// Findings

async fn list_findings(
    State(state): State<AppState>,
    Query(query): Query<StatusFilter<FindingStatus>>,
) -> ApiResult<Json<Vec<AuditFinding>>> {
    Ok(Json(state.services.audits.list_findings(query.status).await?))
}

async fn create_finding(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Json(req): Json<NewAuditFinding>,
) -> ApiResult<(StatusCode, Json<AuditFinding>)> {
    let finding = state.services.audits.create_finding(req, actor).await?;
    Ok((StatusCode::CREATED, Json(finding)))
}

async fn get_finding(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<AuditFinding>> {
    Ok(Json(state.services.audits.get_finding(id).await?))
}

async fn change_finding_status(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<Uuid>,
    Json(req): Json<FindingStatusChange>,
) -> ApiResult<Json<AuditFinding>> {
    let finding = state
        .services
        .audits
        .change_finding_status(id, req.status, req.resolution_notes, actor)
        .await?;
    Ok(Json(finding))
}

async fn delete_finding(
    State(state): State<AppState>,
    _actor: Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.services.audits.delete_finding(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn statistics(State(state): State<AppState>) -> ApiResult<Json<AuditStatistics>> {
    Ok(Json(state.services.audits.statistics().await?))
}
