use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
};
use mutu_core::models::{AcademicYear, NewStudyProgram, NewUnit, StudyProgram, Unit};
use serde::Deserialize;
use uuid::Uuid;

use crate::actor::Actor;
use crate::error::ApiResult;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/units", get(units).post(create_unit))
        .route("/units/{id}", delete(delete_unit))
        .route("/programs", get(programs).post(create_program))
        .route("/programs/{id}", delete(delete_program))
        .route("/years", get(years).post(create_year))
        .route("/years/active", get(active_year))
        .route("/years/{id}/activate", post(activate_year))
}

#[derive(Debug, Deserialize)]
pub struct NewYearRequest {
    label: String,
}

async fn units(State(state): State<AppState>) -> ApiResult<Json<Vec<Unit>>> {
    Ok(Json(state.services.reference.units().await?))
}

async fn create_unit(
    State(state): State<AppState>,
    _actor: Actor,
    Json(req): Json<NewUnit>,
) -> ApiResult<(StatusCode, Json<Unit>)> {
    let unit = state.services.reference.create_unit(req).await?;
    Ok((StatusCode::CREATED, Json(unit)))
}

async fn delete_unit(
    State(state): State<AppState>,
    _actor: Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.services.reference.delete_unit(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn programs(State(state): State<AppState>) -> ApiResult<Json<Vec<StudyProgram>>> {
    Ok(Json(state.services.reference.programs().await?))
}

async fn create_program(
    State(state): State<AppState>,
    _actor: Actor,
    Json(req): Json<NewStudyProgram>,
) -> ApiResult<(StatusCode, Json<StudyProgram>)> {
    let program = state.services.reference.create_program(req).await?;
    Ok((StatusCode::CREATED, Json(program)))
}

async fn delete_program(
    State(state): State<AppState>,
    _actor: Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.services.reference.delete_program(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn years(State(state): State<AppState>) -> ApiResult<Json<Vec<AcademicYear>>> {
    Ok(Json(state.services.reference.years().await?))
}

async fn create_year(
    State(state): State<AppState>,
    _actor: Actor,
    Json(req): Json<NewYearRequest>,
) -> ApiResult<(StatusCode, Json<AcademicYear>)> {
    let year = state.services.reference.create_year(&req.label).await?;
    Ok((StatusCode::CREATED, Json(year)))
}

async fn active_year(State(state): State<AppState>) -> ApiResult<Json<Option<AcademicYear>>> {
    Ok(Json(state.services.reference.active_year().await?))
}

async fn activate_year(
    State(state): State<AppState>,
    _actor: Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<AcademicYear>> {
    Ok(Json(state.services.reference.activate_year(id).await?))
}
