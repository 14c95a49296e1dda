use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts},
    http::{StatusCode, request::Parts},
};
use mutu_core::ActorId;

use crate::state::AppState;

/// Header carrying the already-authenticated user's id.
pub const ACTOR_HEADER: &str = "x-actor-id";

/// Extractor for the acting user. Mutating routes take this and answer 401
/// when the header is missing.
pub struct Actor(pub ActorId);

fn parse(parts: &Parts) -> Result<Option<ActorId>, (StatusCode, &'static str)> {
    let Some(value) = parts.headers.get(ACTOR_HEADER) else {
        return Ok(None);
    };
    value
        .to_str()
        .ok()
        .and_then(|v| v.parse().ok())
        .map(Some)
        .ok_or((StatusCode::BAD_REQUEST, "Malformed x-actor-id header"))
}

impl FromRequestParts<AppState> for Actor {
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &AppState) -> Result<Self, Self::Rejection> {
        parse(parts)?
            .map(Self)
            .ok_or((StatusCode::UNAUTHORIZED, "Missing x-actor-id header"))
    }
}

/// Anonymous callers are allowed where the route takes `Option<Actor>`.
impl OptionalFromRequestParts<AppState> for Actor {
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(parse(parts)?.map(Self))
    }
}
