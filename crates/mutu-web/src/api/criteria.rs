use std::collections::BTreeMap;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
};
use mutu_core::form::{ColumnMapping, ColumnMappingSchema, DataRow, FieldDef, MigrationPolicy, Page};
use mutu_core::models::{Criterion, CriterionNode, CriterionUpdate, NewCriterion};
use serde::Deserialize;
use uuid::Uuid;

use crate::actor::Actor;
use crate::error::ApiResult;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_criteria).post(create_criterion))
        .route("/tree", get(tree))
        .route(
            "/{id}",
            get(get_criterion).put(update_criterion).delete(delete_criterion),
        )
        .route("/{id}/parent", put(move_criterion))
        .route(
            "/{id}/mappings",
            get(get_mappings).post(setup_mappings).put(update_mappings),
        )
        .route("/{id}/mappings/dictionary", get(dictionary))
        .route("/{id}/data", get(data_page))
}

#[derive(Debug, Deserialize)]
pub struct PeriodFilter {
    period_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct MoveRequest {
    parent_id: Option<Uuid>,
}

/// Fields to bind. Without `fields` the criterion's own form is used.
#[derive(Debug, Deserialize)]
pub struct MappingRequest {
    fields: Option<Vec<FieldDef>>,
    policy: Option<MigrationPolicy>,
}

#[derive(Debug, Deserialize)]
pub struct DataQuery {
    submission_id: Option<Uuid>,
    page: Option<i64>,
    per_page: Option<i64>,
}

async fn list_criteria(
    State(state): State<AppState>,
    Query(query): Query<PeriodFilter>,
) -> ApiResult<Json<Vec<Criterion>>> {
    Ok(Json(state.services.criteria.list(query.period_id).await?))
}

async fn tree(
    State(state): State<AppState>,
    Query(query): Query<PeriodFilter>,
) -> ApiResult<Json<Vec<CriterionNode>>> {
    Ok(Json(state.services.criteria.tree(query.period_id).await?))
}

async fn create_criterion(
    State(state): State<AppState>,
    _actor: Actor,
    Json(req): Json<NewCriterion>,
) -> ApiResult<(StatusCode, Json<Criterion>)> {
    let criterion = state.services.criteria.create(req).await?;
    Ok((StatusCode::CREATED, Json(criterion)))
}

async fn get_criterion(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Criterion>> {
    Ok(Json(state.services.criteria.get(id).await?))
}

async fn update_criterion(
    State(state): State<AppState>,
    _actor: Actor,
    Path(id): Path<Uuid>,
    Json(req): Json<CriterionUpdate>,
) -> ApiResult<Json<Criterion>> {
    Ok(Json(state.services.criteria.update(id, req).await?))
}

async fn move_criterion(
    State(state): State<AppState>,
    _actor: Actor,
    Path(id): Path<Uuid>,
    Json(req): Json<MoveRequest>,
) -> ApiResult<Json<Criterion>> {
    Ok(Json(state.services.criteria.move_to(id, req.parent_id).await?))
}

async fn delete_criterion(
    State(state): State<AppState>,
    _actor: Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.services.criteria.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_mappings(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ColumnMappingSchema>> {
    Ok(Json(state.services.mappings.schema(id).await?))
}

async fn setup_mappings(
    State(state): State<AppState>,
    _actor: Actor,
    Path(id): Path<Uuid>,
    Json(req): Json<MappingRequest>,
) -> ApiResult<(StatusCode, Json<Vec<ColumnMapping>>)> {
    let mappings = &state.services.mappings;
    let created = match req.fields {
        Some(fields) => mappings.setup_mappings(id, &fields).await?,
        None => mappings.setup_from_form_config(id).await?,
    };
    Ok((StatusCode::CREATED, Json(created)))
}

/// Rebinds the fields. Existing rows are reinterpreted unless the request
/// names another policy.
async fn update_mappings(
    State(state): State<AppState>,
    _actor: Actor,
    Path(id): Path<Uuid>,
    Json(req): Json<MappingRequest>,
) -> ApiResult<Json<Vec<ColumnMapping>>> {
    let policy = req.policy.unwrap_or(MigrationPolicy::Reinterpret);
    let mappings = &state.services.mappings;
    let updated = match req.fields {
        Some(fields) => mappings.update_mappings(id, &fields, policy).await?,
        None => mappings.update_from_form_config(id, policy).await?,
    };
    Ok(Json(updated))
}

async fn dictionary(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<BTreeMap<String, String>>> {
    Ok(Json(state.services.mappings.mappings_dictionary(id).await?))
}

async fn data_page(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<DataQuery>,
) -> ApiResult<Json<Page<DataRow>>> {
    let mut builder = state.services.data.query(id).await?;
    if let Some(submission_id) = query.submission_id {
        builder = builder.by_pengisian(submission_id);
    }
    let page = builder
        .paginate(query.page.unwrap_or(1), query.per_page.unwrap_or(50))
        .await?;
    Ok(Json(page))
}
