use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::WorkflowConfig;
use crate::workflow::Status;
use crate::{ActorId, Error, Result};

string_enum! {
    pub enum AuditPlanStatus {
        Draft => "draft",
        Approved => "approved",
        InProgress => "in_progress",
        Completed => "completed",
        Cancelled => "cancelled",
    }
}

impl Status for AuditPlanStatus {
    const ENTITY: &'static str = "AuditPlan";

    fn allowed_next(self) -> &'static [Self] {
        match self {
            Self::Draft => &[Self::Approved, Self::Cancelled],
            Self::Approved => &[Self::InProgress, Self::Cancelled],
            Self::InProgress => &[Self::Completed, Self::Cancelled],
            Self::Completed | Self::Cancelled => &[],
        }
    }
}

string_enum! {
    pub enum ScheduleStatus {
        Scheduled => "scheduled",
        InProgress => "in_progress",
        Completed => "completed",
        Cancelled => "cancelled",
    }
}

impl Status for ScheduleStatus {
    const ENTITY: &'static str = "AuditSchedule";

    fn allowed_next(self) -> &'static [Self] {
        match self {
            Self::Scheduled => &[Self::InProgress, Self::Cancelled],
            Self::InProgress => &[Self::Completed, Self::Cancelled],
            Self::Completed | Self::Cancelled => &[],
        }
    }
}

impl ScheduleStatus {
    pub const fn is_settled(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

string_enum! {
    pub enum FindingCategory {
        Major => "major",
        Minor => "minor",
        /// Opportunity for improvement
        Ofi => "ofi",
    }
}

string_enum! {
    pub enum FindingStatus {
        Open => "open",
        InProgress => "in_progress",
        Resolved => "resolved",
        Verified => "verified",
        Closed => "closed",
    }
}

impl Status for FindingStatus {
    const ENTITY: &'static str = "AuditFinding";

    fn allowed_next(self) -> &'static [Self] {
        match self {
            Self::Open => &[Self::InProgress, Self::Resolved],
            Self::InProgress => &[Self::Resolved, Self::Open],
            Self::Resolved => &[Self::Verified, Self::InProgress],
            Self::Verified => &[Self::Closed, Self::InProgress],
            Self::Closed => &[],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditPlan {
    pub id: Uuid,
    pub name: String,
    pub year: i32,
    pub scope: Option<String>,
    pub status: AuditPlanStatus,
    pub approved_by: Option<ActorId>,
    pub approved_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_by: Option<ActorId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewAuditPlan {
    pub name: String,
    pub year: i32,
    #[serde(default)]
    pub scope: Option<String>,
}

impl NewAuditPlan {
    pub fn into_plan(self, actor: ActorId) -> Result<AuditPlan> {
        if self.name.trim().is_empty() {
            return Err(Error::validation("name", "name is required"));
        }
        let now = Utc::now();
        Ok(AuditPlan {
            id: Uuid::new_v4(),
            name: self.name.trim().to_string(),
            year: self.year,
            scope: self.scope,
            status: AuditPlanStatus::Draft,
            approved_by: None,
            approved_at: None,
            completed_at: None,
            created_by: Some(actor),
            created_at: now,
            updated_at: now,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditSchedule {
    pub id: Uuid,
    pub plan_id: Uuid,
    pub unit: String,
    pub scheduled_date: NaiveDate,
    pub auditor_id: Option<ActorId>,
    pub status: ScheduleStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewAuditSchedule {
    pub unit: String,
    pub scheduled_date: NaiveDate,
    #[serde(default)]
    pub auditor_id: Option<ActorId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditFinding {
    pub id: Uuid,
    pub finding_code: String,
    pub audit_plan_id: Option<Uuid>,
    pub unit: Option<String>,
    pub category: FindingCategory,
    pub description: String,
    pub status: FindingStatus,
    pub due_date: NaiveDate,
    pub resolution_notes: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub verified_by: Option<ActorId>,
    pub verified_at: Option<DateTime<Utc>>,
    pub closed_by: Option<ActorId>,
    pub closed_at: Option<DateTime<Utc>>,
    pub created_by: Option<ActorId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewAuditFinding {
    #[serde(default)]
    pub audit_plan_id: Option<Uuid>,
    #[serde(default)]
    pub unit: Option<String>,
    pub category: FindingCategory,
    pub description: String,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
}

impl NewAuditFinding {
    /// Due date: the explicit one, or the category's offset from `today`.
    pub fn resolve_due_date(&self, today: NaiveDate, config: &WorkflowConfig) -> NaiveDate {
        self.due_date
            .unwrap_or_else(|| today + Duration::days(config.due_days(self.category)))
    }

    pub fn into_finding(
        self,
        finding_code: String,
        today: NaiveDate,
        config: &WorkflowConfig,
        actor: ActorId,
    ) -> Result<AuditFinding> {
        if self.description.trim().is_empty() {
            return Err(Error::validation("description", "description is required"));
        }
        let due_date = self.resolve_due_date(today, config);
        let now = Utc::now();
        Ok(AuditFinding {
            id: Uuid::new_v4(),
            finding_code,
            audit_plan_id: self.audit_plan_id,
            unit: self.unit,
            category: self.category,
            description: self.description,
            status: FindingStatus::Open,
            due_date,
            resolution_notes: None,
            resolved_at: None,
            verified_by: None,
            verified_at: None,
            closed_by: None,
            closed_at: None,
            created_by: Some(actor),
            created_at: now,
            updated_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::ensure_transition;

    #[test]
    fn finding_transition_table() {
        use FindingStatus::*;
        let expected: &[(FindingStatus, &[FindingStatus])] = &[
            (Open, &[InProgress, Resolved]),
            (InProgress, &[Resolved, Open]),
            (Resolved, &[Verified, InProgress]),
            (Verified, &[Closed, InProgress]),
            (Closed, &[]),
        ];
        for (from, allowed) in expected {
            for to in FindingStatus::ALL {
                assert_eq!(
                    ensure_transition(*from, *to).is_ok(),
                    allowed.contains(to),
                    "{from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn due_date_defaults_by_category() {
        let today = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let config = WorkflowConfig::default();
        let cases = [
            (FindingCategory::Major, 30),
            (FindingCategory::Minor, 60),
            (FindingCategory::Ofi, 90),
        ];
        for (category, days) in cases {
            let finding = NewAuditFinding {
                audit_plan_id: None,
                unit: None,
                category,
                description: "x".to_string(),
                due_date: None,
            };
            assert_eq!(
                finding.resolve_due_date(today, &config),
                today + Duration::days(days)
            );
        }
    }

    #[test]
    fn explicit_due_date_wins() {
        let today = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let due = NaiveDate::from_ymd_opt(2025, 1, 5).unwrap();
        let finding = NewAuditFinding {
            audit_plan_id: None,
            unit: None,
            category: FindingCategory::Major,
            description: "x".to_string(),
            due_date: Some(due),
        };
        assert_eq!(finding.resolve_due_date(today, &WorkflowConfig::default()), due);
    }
}
