mod audit;
mod criterion;
mod document;
mod period;
mod reference;
pub(crate) mod rtl;
mod rtm;
mod spmi;
mod submission;
pub(crate) mod survey;

pub use audit::{
    AuditFinding, AuditPlan, AuditPlanStatus, AuditSchedule, FindingCategory, FindingStatus,
    NewAuditFinding, NewAuditPlan, NewAuditSchedule, ScheduleStatus,
};
pub use criterion::{
    build_tree, Criterion, CriterionMetadata, CriterionNode, CriterionUpdate, NewCriterion,
};
pub use document::{Document, UploadedFile};
pub use period::{AccreditationPeriod, NewPeriod, PeriodStatus};
pub use reference::{AcademicYear, NewStudyProgram, NewUnit, StudyProgram, Unit};
pub use rtl::{NewRtl, Rtl, RtlStatus, VerificationOutcome, VerificationStatus};
pub use rtm::{ActionItem, ActionStatus, NewActionItem, NewRtm, Rtm, RtmStatus};
pub use spmi::{
    IndicatorMonitoring, NewIndicator, NewMonitoring, NewStandard, SpmiIndicator, SpmiStandard,
    StandardStatus,
};
pub use submission::{CriterionSubmission, NewSubmission, SubmissionContent, SubmissionStatus};
pub use survey::{
    NewQuestion, NewSurvey, QuestionType, Survey, SurveyQuestion, SurveyResponse, SurveyStatus,
};

use std::collections::BTreeMap;

use serde::Serialize;

/// Row counts per status value, as returned by the statistics queries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct StatusCounts(pub BTreeMap<String, i64>);

impl StatusCounts {
    pub fn get(&self, status: &str) -> i64 {
        self.0.get(status).copied().unwrap_or(0)
    }

    pub fn total(&self) -> i64 {
        self.0.values().sum()
    }
}
