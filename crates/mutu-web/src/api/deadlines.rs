use axum::{
    Json, Router,
    extract::{Query, State},
    routing::post,
};
use chrono::{NaiveDate, Utc};
use mutu_core::DomainEvent;
use serde::Deserialize;

use crate::actor::Actor;
use crate::error::ApiResult;
use crate::state::AppState;

const DEFAULT_HORIZON_DAYS: u64 = 7;

pub fn router() -> Router<AppState> {
    Router::new().route("/scan", post(scan))
}

#[derive(Debug, Deserialize)]
pub struct ScanQuery {
    today: Option<NaiveDate>,
    horizon_days: Option<u64>,
}

/// Announces everything due within the horizon and returns the events.
async fn scan(
    State(state): State<AppState>,
    _actor: Actor,
    Query(query): Query<ScanQuery>,
) -> ApiResult<Json<Vec<DomainEvent>>> {
    let today = query.today.unwrap_or_else(|| Utc::now().date_naive());
    let horizon = query.horizon_days.unwrap_or(DEFAULT_HORIZON_DAYS);
    Ok(Json(state.services.deadlines.scan(today, horizon).await?))
}
