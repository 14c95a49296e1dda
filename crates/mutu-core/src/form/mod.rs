//! Dynamic criterion forms.
//!
//! A criterion's `form_config` declares named fields once. Each field is
//! bound to one of the generic `c1..c30` columns of `butir_data` by the
//! mapping service, and every read or write goes through that binding.
//! Validation and completion work on the named form data directly.

pub mod completion;
pub mod config;
pub mod data;
pub mod mapping;
pub mod query;
pub mod validator;

pub use completion::calculate_completion;
pub use config::{
    ChecklistItem, FieldDef, FieldOptions, FieldType, FormConfig, FormKind, OptionEntry, Section,
};
pub use data::{ButirDataService, NewDataRow};
pub use mapping::{
    ButirMappingService, ColumnMapping, ColumnMappingSchema, ColumnSlot, FieldConfig,
    MigrationPolicy, MAX_MAPPED_FIELDS,
};
pub use query::{ButirDataQuery, Comparison, DataRow, Direction, Page, RawRow};
pub use validator::{Constraint, DynamicFormValidator, FieldPath, Rule, RuleSet};
