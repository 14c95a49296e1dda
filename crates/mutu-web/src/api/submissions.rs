use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    routing::{get, post, put},
};
use mutu_core::form::{DataRow, NewDataRow};
use mutu_core::models::{
    CriterionSubmission, Document, NewSubmission, StatusCounts, SubmissionContent, UploadedFile,
};
use mutu_core::Error;
use serde::Deserialize;
use uuid::Uuid;

use crate::actor::Actor;
use crate::error::ApiResult;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_submission))
        .route("/statistics", get(statistics))
        .route("/{id}", get(get_submission))
        .route("/{id}/content", put(save_content))
        .route("/{id}/submit", post(submit))
        .route("/{id}/review", post(start_review))
        .route("/{id}/approve", post(approve))
        .route("/{id}/reject", post(reject))
        .route("/{id}/rows", get(rows).post(add_rows).put(sync_rows))
        .route("/{id}/documents", get(documents).post(upload))
}

#[derive(Debug, Deserialize)]
pub struct RejectRequest {
    notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    name: Option<String>,
}

async fn create_submission(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Json(req): Json<NewSubmission>,
) -> ApiResult<(StatusCode, Json<CriterionSubmission>)> {
    let submission = state.services.submissions.create(req, actor).await?;
    Ok((StatusCode::CREATED, Json(submission)))
}

async fn get_submission(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<CriterionSubmission>> {
    Ok(Json(state.services.submissions.get(id).await?))
}

async fn save_content(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<Uuid>,
    Json(req): Json<SubmissionContent>,
) -> ApiResult<Json<CriterionSubmission>> {
    let submission = state.services.submissions.save_content(id, req, actor).await?;
    Ok(Json(submission))
}

async fn submit(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<CriterionSubmission>> {
    Ok(Json(state.services.submissions.submit(id, actor).await?))
}

async fn start_review(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<CriterionSubmission>> {
    Ok(Json(state.services.submissions.start_review(id, actor).await?))
}

async fn approve(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<CriterionSubmission>> {
    Ok(Json(state.services.submissions.approve(id, actor).await?))
}

async fn reject(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<Uuid>,
    Json(req): Json<RejectRequest>,
) -> ApiResult<Json<CriterionSubmission>> {
    let submission = state.services.submissions.reject(id, req.notes, actor).await?;
    Ok(Json(submission))
}

async fn statistics(State(state): State<AppState>) -> ApiResult<Json<StatusCounts>> {
    Ok(Json(state.services.submissions.statistics().await?))
}

// Data rows

async fn rows(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<DataRow>>> {
    Ok(Json(state.services.data.rows(id).await?))
}

async fn add_rows(
    State(state): State<AppState>,
    _actor: Actor,
    Path(id): Path<Uuid>,
    Json(req): Json<Vec<NewDataRow>>,
) -> ApiResult<(StatusCode, Json<Vec<DataRow>>)> {
    let rows = state.services.data.bulk_create(id, req).await?;
    Ok((StatusCode::CREATED, Json(rows)))
}

async fn sync_rows(
    State(state): State<AppState>,
    _actor: Actor,
    Path(id): Path<Uuid>,
    Json(req): Json<Vec<NewDataRow>>,
) -> ApiResult<Json<Vec<DataRow>>> {
    Ok(Json(state.services.data.sync_data(id, req).await?))
}

// Documents

async fn documents(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<Document>>> {
    Ok(Json(state.services.documents.list(id).await?))
}

/// Raw request body is the file; `?name=` carries its original name.
async fn upload(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<Uuid>,
    Query(query): Query<UploadQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Document>)> {
    let original_name = query
        .name
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| Error::validation("name", "file name is required"))?;
    let mime_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let file = UploadedFile {
        original_name,
        mime_type,
        bytes: body.to_vec(),
    };
    let document = state.services.documents.upload(id, file, actor).await?;
    Ok((StatusCode::CREATED, Json(document)))
}
