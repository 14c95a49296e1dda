#[macro_use]
mod macros;

pub mod actor;
pub mod code;
pub mod config;
pub mod error;
pub mod files;
pub mod form;
pub mod models;
pub mod notify;
pub mod progress;
pub mod service;
pub mod storage;
pub mod workflow;

pub use actor::ActorId;
pub use config::WorkflowConfig;
pub use error::{Error, ErrorKind, Result, ValidationErrors};
pub use files::{FileStore, LocalFileStore};
pub use form::{ButirDataService, ButirMappingService, DynamicFormValidator, FormConfig};
pub use notify::{BroadcastNotifier, DomainEvent, Notifier, TracingNotifier};
pub use service::{
    AuditService, CriterionService, DeadlineService, DocumentService, PeriodService,
    ReferenceService, RtlService, RtmOutcome, RtmService, ServiceContext, Services, SpmiService,
    SubmissionService, SurveyService,
};
pub use storage::Storage;
pub use workflow::{Status, Transition};
