mod audits;
mod criteria;
mod data;
mod deadlines;
mod documents;
mod periods;
mod reference;
mod rtls;
mod rtms;
mod spmi;
mod submissions;
mod surveys;

#[cfg(test)]
mod tests;

use axum::Router;
use serde::Deserialize;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/audits", audits::router())
        .nest("/criteria", criteria::router())
        .nest("/data-rows", data::router())
        .nest("/deadlines", deadlines::router())
        .nest("/documents", documents::router())
        .nest("/periods", periods::router())
        .nest("/reference", reference::router())
        .nest("/rtls", rtls::router())
        .nest("/rtms", rtms::router())
        .nest("/spmi", spmi::router())
        .nest("/submissions", submissions::router())
        .nest("/surveys", surveys::router())
}

/// `?status=` filter on list routes.
#[derive(Debug, Deserialize)]
pub struct StatusFilter<S> {
    pub status: Option<S>,
}

/// Body of the generic status-change routes.
#[derive(Debug, Deserialize)]
pub struct StatusChange<S> {
    pub status: S,
}
