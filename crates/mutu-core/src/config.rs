use serde::{Deserialize, Serialize};

use crate::models::FindingCategory;

/// Tunables for the workflow services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Days until a major finding is due when no due date is given
    #[serde(default = "default_major_days")]
    pub major_due_days: i64,
    #[serde(default = "default_minor_days")]
    pub minor_due_days: i64,
    /// Opportunity-for-improvement findings
    #[serde(default = "default_ofi_days")]
    pub ofi_due_days: i64,
}

const fn default_major_days() -> i64 {
    30
}

const fn default_minor_days() -> i64 {
    60
}

const fn default_ofi_days() -> i64 {
    90
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            major_due_days: default_major_days(),
            minor_due_days: default_minor_days(),
            ofi_due_days: default_ofi_days(),
        }
    }
}

impl WorkflowConfig {
    pub const fn due_days(&self, category: FindingCategory) -> i64 {
        match category {
            FindingCategory::Major => self.major_due_days,
            FindingCategory::Minor => self.minor_due_days,
            FindingCategory::Ofi => self.ofi_due_days,
        }
    }
}
