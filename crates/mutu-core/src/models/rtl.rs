use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::workflow::Status;
use crate::{ActorId, Error, Result};

string_enum! {
    pub enum RtlStatus {
        NotStarted => "not_started",
        InProgress => "in_progress",
        Completed => "completed",
    }
}

impl Status for RtlStatus {
    const ENTITY: &'static str = "RTL";

    fn allowed_next(self) -> &'static [Self] {
        match self {
            Self::NotStarted => &[Self::InProgress],
            Self::InProgress => &[Self::Completed],
            // reopened by a rejected or revision verification
            Self::Completed => &[Self::InProgress],
        }
    }
}

string_enum! {
    /// Verification track, independent of the work status.
    pub enum VerificationStatus {
        NotRequested => "none",
        Pending => "pending",
        Approved => "approved",
        Rejected => "rejected",
        Revision => "revision",
    }
}

impl Status for VerificationStatus {
    const ENTITY: &'static str = "RTLVerification";

    fn allowed_next(self) -> &'static [Self] {
        match self {
            Self::NotRequested | Self::Rejected | Self::Revision => &[Self::Pending],
            Self::Pending => &[Self::Approved, Self::Rejected, Self::Revision],
            Self::Approved => &[],
        }
    }
}

string_enum! {
    pub enum VerificationOutcome {
        Approved => "approved",
        Rejected => "rejected",
        Revision => "revision",
    }
}

impl VerificationOutcome {
    pub const fn status(self) -> VerificationStatus {
        match self {
            Self::Approved => VerificationStatus::Approved,
            Self::Rejected => VerificationStatus::Rejected,
            Self::Revision => VerificationStatus::Revision,
        }
    }

    pub const fn reopens(self) -> bool {
        matches!(self, Self::Rejected | Self::Revision)
    }
}

/// Corrective action plan ("rencana tindak lanjut") for an audit finding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rtl {
    pub id: Uuid,
    pub rtl_code: String,
    pub finding_id: Uuid,
    pub action_plan: String,
    pub pic_id: Option<ActorId>,
    pub target_date: Option<NaiveDate>,
    pub status: RtlStatus,
    pub completion_percentage: f64,
    pub verification_status: VerificationStatus,
    pub verification_notes: Option<String>,
    pub verified_by: Option<ActorId>,
    pub verified_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_by: Option<ActorId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewRtl {
    pub finding_id: Uuid,
    #[serde(default)]
    pub rtl_code: Option<String>,
    pub action_plan: String,
    #[serde(default)]
    pub pic_id: Option<ActorId>,
    #[serde(default)]
    pub target_date: Option<NaiveDate>,
}

impl NewRtl {
    pub fn into_rtl(self, rtl_code: String, actor: ActorId) -> Result<Rtl> {
        if self.action_plan.trim().is_empty() {
            return Err(Error::validation("action_plan", "action plan is required"));
        }
        let now = Utc::now();
        Ok(Rtl {
            id: Uuid::new_v4(),
            rtl_code,
            finding_id: self.finding_id,
            action_plan: self.action_plan,
            pic_id: self.pic_id,
            target_date: self.target_date,
            status: RtlStatus::NotStarted,
            completion_percentage: 0.0,
            verification_status: VerificationStatus::NotRequested,
            verification_notes: None,
            verified_by: None,
            verified_at: None,
            started_at: None,
            completed_at: None,
            created_by: Some(actor),
            created_at: now,
            updated_at: now,
        })
    }
}

/// Checks a progress value is a percentage.
pub(crate) fn check_percentage(field: &str, value: f64) -> Result<f64> {
    if (0.0..=100.0).contains(&value) {
        Ok(value)
    } else {
        Err(Error::validation(field, "must be between 0 and 100"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_and_revision_reopen() {
        assert!(VerificationOutcome::Rejected.reopens());
        assert!(VerificationOutcome::Revision.reopens());
        assert!(!VerificationOutcome::Approved.reopens());
    }

    #[test]
    fn percentage_bounds() {
        assert!(check_percentage("p", 100.0).is_ok());
        assert!(check_percentage("p", 100.5).is_err());
        assert!(check_percentage("p", -1.0).is_err());
    }

    #[test]
    fn verification_needs_pending_request() {
        use crate::workflow::ensure_transition;
        assert!(ensure_transition(VerificationStatus::NotRequested, VerificationStatus::Approved).is_err());
        assert!(ensure_transition(VerificationStatus::Pending, VerificationOutcome::Revision.status()).is_ok());
        assert!(ensure_transition(VerificationStatus::Revision, VerificationStatus::Pending).is_ok());
    }

    #[test]
    fn not_started_only_starts() {
        assert_eq!(RtlStatus::NotStarted.allowed_next(), &[RtlStatus::InProgress]);
    }
}
