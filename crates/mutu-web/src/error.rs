use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use mutu_core::{Error, ErrorKind};
use serde_json::json;

/// A service error on its way out as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

const fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::InvalidTransition | ErrorKind::DuplicateKey | ErrorKind::StructuralConstraint => {
            StatusCode::CONFLICT
        }
        ErrorKind::Validation | ErrorKind::CapacityExceeded => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::FieldNotMapped => StatusCode::BAD_REQUEST,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

const fn code_for(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::NotFound => "not_found",
        ErrorKind::InvalidTransition => "invalid_transition",
        ErrorKind::DuplicateKey => "duplicate_key",
        ErrorKind::Validation => "validation_failed",
        ErrorKind::StructuralConstraint => "structural_constraint",
        ErrorKind::CapacityExceeded => "capacity_exceeded",
        ErrorKind::FieldNotMapped => "field_not_mapped",
        ErrorKind::Internal => "internal",
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();
        let status = status_for(kind);

        let body = match &self.0 {
            Error::Validation(errors) => json!({
                "error": code_for(kind),
                "message": "Validation failed",
                "errors": errors,
            }),
            err if kind == ErrorKind::Internal => {
                tracing::error!(error = %err, "Request failed");
                json!({ "error": code_for(kind), "message": "Internal server error" })
            }
            err => json!({ "error": code_for(kind), "message": err.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (Error::not_found("RTL", Uuid::nil()), StatusCode::NOT_FOUND),
            (Error::structural("has children"), StatusCode::CONFLICT),
            (
                Error::validation("notes", "notes is required"),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                Error::FieldNotMapped {
                    criterion_id: Uuid::nil(),
                    field: "gaji".to_string(),
                },
                StatusCode::BAD_REQUEST,
            ),
            (
                Error::Delivery("closed".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError(err).into_response().status(), status);
        }
    }
}
