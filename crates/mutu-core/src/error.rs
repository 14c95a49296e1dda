use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// Coarse classification used by callers to pick a transport status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidTransition,
    DuplicateKey,
    Validation,
    StructuralConstraint,
    CapacityExceeded,
    FieldNotMapped,
    Internal,
}

/// Field-keyed validation messages, ordered by field path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn into_result(self) -> crate::Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(self))
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{field}: {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("{entity} cannot move from '{from}' to '{to}': {reason}")]
    InvalidTransition {
        entity: &'static str,
        from: String,
        to: String,
        reason: String,
    },

    #[error("Duplicate {field}: '{value}' already exists")]
    DuplicateKey { field: &'static str, value: String },

    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    #[error("{0}")]
    StructuralConstraint(String),

    #[error("Form declares {requested} fields but at most {limit} can be mapped")]
    CapacityExceeded { limit: usize, requested: usize },

    #[error("Field '{field}' is not mapped for criterion {criterion_id}")]
    FieldNotMapped { criterion_id: Uuid, field: String },

    #[error("Invalid {kind}: {value}")]
    InvalidValue { kind: &'static str, value: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Notification delivery failed: {0}")]
    Delivery(String),
}

impl Error {
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            Self::DuplicateKey { .. } => ErrorKind::DuplicateKey,
            Self::Validation(_) | Self::InvalidValue { .. } => ErrorKind::Validation,
            Self::StructuralConstraint(_) => ErrorKind::StructuralConstraint,
            Self::CapacityExceeded { .. } => ErrorKind::CapacityExceeded,
            Self::FieldNotMapped { .. } => ErrorKind::FieldNotMapped,
            Self::Database(_) | Self::Serialization(_) | Self::Io(_) | Self::Delivery(_) => {
                ErrorKind::Internal
            }
        }
    }

    pub const fn not_found(entity: &'static str, id: Uuid) -> Self {
        Self::NotFound { entity, id }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = ValidationErrors::new();
        errors.add(field, message);
        Self::Validation(errors)
    }

    pub fn structural(message: impl Into<String>) -> Self {
        Self::StructuralConstraint(message.into())
    }

    /// Translates a unique-constraint violation into `DuplicateKey`, passing
    /// every other database error through.
    pub(crate) fn from_insert(err: sqlx::Error, field: &'static str, value: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            if db_err.is_unique_violation() {
                return Self::DuplicateKey {
                    field,
                    value: value.to_string(),
                };
            }
        }
        Self::Database(err)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_display_in_field_order() {
        let mut errors = ValidationErrors::new();
        errors.add("minutes", "is required");
        errors.add("decisions", "is required");
        assert_eq!(
            errors.to_string(),
            "decisions: is required; minutes: is required"
        );
    }

    #[test]
    fn empty_validation_errors_are_ok() {
        assert!(ValidationErrors::new().into_result().is_ok());
    }

    #[test]
    fn kinds_follow_variants() {
        assert_eq!(
            Error::not_found("RTL", Uuid::nil()).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            Error::structural("has children").kind(),
            ErrorKind::StructuralConstraint
        );
        assert_eq!(
            Error::CapacityExceeded {
                limit: 30,
                requested: 31
            }
            .kind(),
            ErrorKind::CapacityExceeded
        );
    }
}
