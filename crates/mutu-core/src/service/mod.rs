//! Orchestration over the repositories.
//!
//! Every mutating operation runs on one transaction: load, check the
//! transition and its preconditions, write, commit. Events go out only
//! after the commit succeeds.

pub mod audit;
pub mod criterion;
pub mod deadline;
pub mod document;
pub mod period;
pub mod reference;
pub mod rtl;
pub mod rtm;
pub mod spmi;
pub mod submission;
pub mod survey;

use std::sync::Arc;

use chrono::{Datelike, NaiveDate, Utc};
use tracing::info;
use uuid::Uuid;

use crate::config::WorkflowConfig;
use crate::files::FileStore;
use crate::form::{ButirDataService, ButirMappingService, DynamicFormValidator};
use crate::notify::{dispatch, DomainEvent, Notifier, TracingNotifier};
use crate::storage::Storage;
use crate::workflow::Status;
use crate::ActorId;

pub use audit::{AuditService, AuditStatistics};
pub use criterion::CriterionService;
pub use deadline::DeadlineService;
pub use document::DocumentService;
pub use period::{PeriodService, PeriodSummary};
pub use reference::ReferenceService;
pub use rtl::{RtlService, RtlStatistics};
pub use rtm::{RtmOutcome, RtmService, RtmStatistics};
pub use spmi::SpmiService;
pub use submission::SubmissionService;
pub use survey::{SurveyService, SurveySummary};

/// What every service needs: the store, the notifier, and the tunables.
#[derive(Clone)]
pub struct ServiceContext {
    pub storage: Storage,
    pub notifier: Arc<dyn Notifier>,
    pub config: WorkflowConfig,
}

impl ServiceContext {
    pub fn new(storage: Storage) -> Self {
        Self {
            storage,
            notifier: Arc::new(TracingNotifier),
            config: WorkflowConfig::default(),
        }
    }

    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: WorkflowConfig) -> Self {
        self.config = config;
        self
    }

    pub(crate) async fn notify(&self, event: DomainEvent) {
        dispatch(self.notifier.as_ref(), event).await;
    }

    /// Logs a committed transition and announces it.
    pub(crate) async fn status_changed<S: Status>(
        &self,
        id: Uuid,
        from: S,
        to: S,
        actor: Option<ActorId>,
    ) {
        info!(entity = S::ENTITY, %id, %from, %to, actor = ?actor, "Status changed");
        self.notify(DomainEvent::StatusChanged {
            entity: S::ENTITY,
            id,
            from: from.to_string(),
            to: to.to_string(),
            actor,
        })
        .await;
    }

    pub(crate) async fn approval_requested(&self, entity: &'static str, id: Uuid) {
        self.notify(DomainEvent::ApprovalRequested { entity, id }).await;
    }
}

pub(crate) fn today() -> NaiveDate {
    Utc::now().date_naive()
}

pub(crate) fn current_year() -> i32 {
    Utc::now().year()
}

/// Trims `value` and fails validation on `field` when nothing is left.
pub(crate) fn non_empty(field: &str, value: Option<String>) -> crate::Result<String> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(crate::Error::validation(field, format!("{field} is required"))),
    }
}

/// One handle over every service, sharing a single context.
#[derive(Clone)]
pub struct Services {
    pub periods: PeriodService,
    pub criteria: CriterionService,
    pub submissions: SubmissionService,
    pub audits: AuditService,
    pub rtls: RtlService,
    pub rtms: RtmService,
    pub spmi: SpmiService,
    pub surveys: SurveyService,
    pub documents: DocumentService,
    pub reference: ReferenceService,
    pub deadlines: DeadlineService,
    pub mappings: ButirMappingService,
    pub data: ButirDataService,
    pub validator: DynamicFormValidator,
}

impl Services {
    pub fn new(ctx: &ServiceContext, files: Arc<dyn FileStore>) -> Self {
        Self {
            periods: PeriodService::new(ctx.clone()),
            criteria: CriterionService::new(ctx.clone()),
            submissions: SubmissionService::new(ctx.clone()),
            audits: AuditService::new(ctx.clone()),
            rtls: RtlService::new(ctx.clone()),
            rtms: RtmService::new(ctx.clone()),
            spmi: SpmiService::new(ctx.clone()),
            surveys: SurveyService::new(ctx.clone()),
            documents: DocumentService::new(ctx.clone(), files),
            reference: ReferenceService::new(ctx.clone()),
            deadlines: DeadlineService::new(ctx.clone()),
            mappings: ButirMappingService::new(ctx.storage.clone()),
            data: ButirDataService::new(ctx.storage.clone()),
            validator: DynamicFormValidator,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_empty_trims() {
        assert_eq!(non_empty("minutes", Some("  ok ".to_string())).unwrap(), "ok");
        assert!(non_empty("minutes", Some("   ".to_string())).is_err());
        assert!(non_empty("minutes", None).is_err());
    }
}
