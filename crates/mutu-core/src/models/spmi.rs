use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::progress::{Achievement, AttentionStatus};
use crate::workflow::Status;
use crate::{ActorId, Error, Result};

string_enum! {
    pub enum StandardStatus {
        Draft => "draft",
        Active => "active",
        Revision => "revision",
        Inactive => "inactive",
    }
}

impl Status for StandardStatus {
    const ENTITY: &'static str = "SpmiStandard";

    fn allowed_next(self) -> &'static [Self] {
        match self {
            Self::Draft => &[Self::Active],
            Self::Active => &[Self::Revision, Self::Inactive],
            Self::Revision => &[Self::Active, Self::Inactive],
            Self::Inactive => &[],
        }
    }
}

/// Internal quality-assurance standard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpmiStandard {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub category: String,
    pub statement: Option<String>,
    pub status: StandardStatus,
    pub version: i64,
    pub approved_by: Option<ActorId>,
    pub approved_at: Option<DateTime<Utc>>,
    pub created_by: Option<ActorId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewStandard {
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub statement: Option<String>,
}

impl NewStandard {
    pub fn into_standard(self, code: String, actor: ActorId) -> Result<SpmiStandard> {
        if self.name.trim().is_empty() {
            return Err(Error::validation("name", "name is required"));
        }
        if self.category.trim().is_empty() {
            return Err(Error::validation("category", "category is required"));
        }
        let now = Utc::now();
        Ok(SpmiStandard {
            id: Uuid::new_v4(),
            code,
            name: self.name.trim().to_string(),
            category: self.category.trim().to_string(),
            statement: self.statement,
            status: StandardStatus::Draft,
            version: 1,
            approved_by: None,
            approved_at: None,
            created_by: Some(actor),
            created_at: now,
            updated_at: now,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpmiIndicator {
    pub id: Uuid,
    pub code: String,
    pub standard_id: Uuid,
    pub name: String,
    pub category: String,
    pub target_value: f64,
    pub unit: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewIndicator {
    pub name: String,
    pub category: String,
    pub target_value: f64,
    #[serde(default)]
    pub unit: Option<String>,
}

impl NewIndicator {
    pub fn into_indicator(self, standard_id: Uuid, code: String) -> Result<SpmiIndicator> {
        if self.name.trim().is_empty() {
            return Err(Error::validation("name", "name is required"));
        }
        if self.target_value < 0.0 {
            return Err(Error::validation("target_value", "target must not be negative"));
        }
        Ok(SpmiIndicator {
            id: Uuid::new_v4(),
            code,
            standard_id,
            name: self.name.trim().to_string(),
            category: self.category.trim().to_string(),
            target_value: self.target_value,
            unit: self.unit,
            created_at: Utc::now(),
        })
    }
}

/// One measurement of an indicator against its target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorMonitoring {
    pub id: Uuid,
    pub code: String,
    pub indicator_id: Uuid,
    pub period_label: String,
    pub target_value: f64,
    pub actual_value: f64,
    pub achievement: f64,
    pub attention: AttentionStatus,
    pub notes: Option<String>,
    pub created_by: Option<ActorId>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewMonitoring {
    pub period_label: String,
    pub actual_value: f64,
    /// Overrides the indicator's target for this period
    #[serde(default)]
    pub target_value: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewMonitoring {
    pub fn into_monitoring(
        self,
        indicator: &SpmiIndicator,
        code: String,
        actor: ActorId,
    ) -> IndicatorMonitoring {
        let target_value = self.target_value.unwrap_or(indicator.target_value);
        let measured = Achievement::measure(self.actual_value, target_value);
        IndicatorMonitoring {
            id: Uuid::new_v4(),
            code,
            indicator_id: indicator.id,
            period_label: self.period_label,
            target_value,
            actual_value: self.actual_value,
            achievement: measured.percentage,
            attention: measured.status,
            notes: self.notes,
            created_by: Some(actor),
            created_at: Utc::now(),
        }
    }
}
