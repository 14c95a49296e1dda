use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::workflow::Status;
use crate::ActorId;

string_enum! {
    pub enum SubmissionStatus {
        Draft => "draft",
        Submitted => "submitted",
        Review => "review",
        Approved => "approved",
        Revision => "revision",
    }
}

impl Status for SubmissionStatus {
    const ENTITY: &'static str = "CriterionSubmission";

    fn allowed_next(self) -> &'static [Self] {
        match self {
            Self::Draft | Self::Revision => &[Self::Submitted],
            Self::Submitted => &[Self::Review, Self::Approved, Self::Revision],
            Self::Review => &[Self::Approved, Self::Revision],
            Self::Approved => &[],
        }
    }
}

impl SubmissionStatus {
    /// Content and data rows may only change while the submitter holds it.
    pub const fn is_editable(self) -> bool {
        matches!(self, Self::Draft | Self::Revision)
    }

    pub const fn is_under_review(self) -> bool {
        matches!(self, Self::Submitted | Self::Review)
    }
}

/// A "pengisian butir": one period's content for one criterion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CriterionSubmission {
    pub id: Uuid,
    pub period_id: Uuid,
    pub criterion_id: Uuid,
    pub content: Option<String>,
    pub form_data: Value,
    pub status: SubmissionStatus,
    pub is_complete: bool,
    pub completion_percentage: f64,
    pub notes: Option<String>,
    pub submitted_by: Option<ActorId>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<ActorId>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub approved_by: Option<ActorId>,
    pub approved_at: Option<DateTime<Utc>>,
    pub created_by: Option<ActorId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CriterionSubmission {
    pub fn has_content(&self) -> bool {
        self.content.as_deref().is_some_and(|c| !c.trim().is_empty())
    }

    /// Values seen by the required-field completion formula: the form data
    /// object plus `content`.
    pub fn completion_values(&self) -> Map<String, Value> {
        let mut values = self.form_data.as_object().cloned().unwrap_or_default();
        values.insert(
            "content".to_string(),
            self.content.clone().map_or(Value::Null, Value::String),
        );
        values
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewSubmission {
    pub period_id: Uuid,
    pub criterion_id: Uuid,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub form_data: Option<Value>,
    #[serde(default)]
    pub is_complete: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmissionContent {
    pub content: Option<String>,
    pub form_data: Option<Value>,
    pub is_complete: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::ensure_transition;

    #[test]
    fn approved_is_terminal() {
        assert!(SubmissionStatus::Approved.is_terminal());
        for to in SubmissionStatus::ALL {
            assert!(ensure_transition(SubmissionStatus::Approved, *to).is_err());
        }
    }

    #[test]
    fn revision_can_resubmit() {
        assert!(ensure_transition(SubmissionStatus::Revision, SubmissionStatus::Submitted).is_ok());
        assert!(ensure_transition(SubmissionStatus::Draft, SubmissionStatus::Approved).is_err());
    }
}
