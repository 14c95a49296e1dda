use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
};
use mutu_core::models::{
    NewQuestion, NewSurvey, Survey, SurveyQuestion, SurveyResponse, SurveyStatus,
};
use mutu_core::service::SurveySummary;
use serde::Deserialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use super::StatusFilter;
use crate::actor::Actor;
use crate::error::ApiResult;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_surveys).post(create_survey))
        .route("/{id}", get(get_survey).delete(delete_survey))
        .route("/{id}/summary", get(summary))
        .route("/{id}/publish", post(publish))
        .route("/{id}/close", post(close))
        .route("/{id}/questions", get(questions).post(add_question))
        .route("/questions/{id}", delete(remove_question))
        .route("/{id}/responses", get(responses).post(respond))
}

/// Answers keyed by question id.
#[derive(Debug, Deserialize)]
pub struct ResponseRequest {
    answers: Map<String, Value>,
}

async fn list_surveys(
    State(state): State<AppState>,
    Query(query): Query<StatusFilter<SurveyStatus>>,
) -> ApiResult<Json<Vec<Survey>>> {
    Ok(Json(state.services.surveys.list(query.status).await?))
}

async fn create_survey(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Json(req): Json<NewSurvey>,
) -> ApiResult<(StatusCode, Json<Survey>)> {
    let survey = state.services.surveys.create(req, actor).await?;
    Ok((StatusCode::CREATED, Json(survey)))
}

async fn get_survey(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Survey>> {
    Ok(Json(state.services.surveys.get(id).await?))
}

async fn delete_survey(
    State(state): State<AppState>,
    _actor: Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.services.surveys.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn summary(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<SurveySummary>> {
    Ok(Json(state.services.surveys.summary(id).await?))
}

async fn publish(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Survey>> {
    Ok(Json(state.services.surveys.publish(id, actor).await?))
}

async fn close(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Survey>> {
    Ok(Json(state.services.surveys.close(id, actor).await?))
}

async fn questions(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<SurveyQuestion>>> {
    Ok(Json(state.services.surveys.questions(id).await?))
}

async fn add_question(
    State(state): State<AppState>,
    _actor: Actor,
    Path(id): Path<Uuid>,
    Json(req): Json<NewQuestion>,
) -> ApiResult<(StatusCode, Json<SurveyQuestion>)> {
    let question = state.services.surveys.add_question(id, req).await?;
    Ok((StatusCode::CREATED, Json(question)))
}

async fn remove_question(
    State(state): State<AppState>,
    _actor: Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.services.surveys.remove_question(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn responses(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<SurveyResponse>>> {
    Ok(Json(state.services.surveys.responses(id).await?))
}

/// Respondents may stay anonymous.
async fn respond(
    State(state): State<AppState>,
    actor: Option<Actor>,
    Path(id): Path<Uuid>,
    Json(req): Json<ResponseRequest>,
) -> ApiResult<(StatusCode, Json<SurveyResponse>)> {
    let response = state
        .services
        .surveys
        .respond(id, req.answers, actor.map(|Actor(a)| a))
        .await?;
    Ok((StatusCode::CREATED, Json(response)))
}
