use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::workflow::Status;
use crate::{ActorId, Error, Result};

string_enum! {
    pub enum PeriodStatus {
        Persiapan => "persiapan",
        Pengisian => "pengisian",
        Review => "review",
        Selesai => "selesai",
        Ditunda => "ditunda",
    }
}

impl Status for PeriodStatus {
    const ENTITY: &'static str = "AccreditationPeriod";

    fn allowed_next(self) -> &'static [Self] {
        match self {
            Self::Persiapan => &[Self::Pengisian, Self::Ditunda],
            Self::Pengisian => &[Self::Review, Self::Ditunda],
            Self::Review => &[Self::Selesai, Self::Pengisian],
            Self::Selesai => &[],
            Self::Ditunda => &[Self::Persiapan, Self::Pengisian],
        }
    }

    fn accepts_noop() -> bool {
        true
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccreditationPeriod {
    pub id: Uuid,
    pub name: String,
    pub program: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: PeriodStatus,
    pub created_by: Option<ActorId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewPeriod {
    pub name: String,
    #[serde(default)]
    pub program: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl NewPeriod {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::validation("name", "name is required"));
        }
        if self.end_date < self.start_date {
            return Err(Error::validation(
                "end_date",
                "end date must not be before the start date",
            ));
        }
        Ok(())
    }

    pub fn into_period(self, actor: ActorId) -> AccreditationPeriod {
        let now = Utc::now();
        AccreditationPeriod {
            id: Uuid::new_v4(),
            name: self.name.trim().to_string(),
            program: self.program,
            start_date: self.start_date,
            end_date: self.end_date,
            status: PeriodStatus::Persiapan,
            created_by: Some(actor),
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::{ensure_transition, Transition};

    #[test]
    fn transition_table() {
        use PeriodStatus::*;
        let expected: &[(PeriodStatus, &[PeriodStatus])] = &[
            (Persiapan, &[Pengisian, Ditunda]),
            (Pengisian, &[Review, Ditunda]),
            (Review, &[Selesai, Pengisian]),
            (Selesai, &[]),
            (Ditunda, &[Persiapan, Pengisian]),
        ];
        for (from, allowed) in expected {
            for to in PeriodStatus::ALL {
                let result = ensure_transition(*from, *to);
                if from == to {
                    assert_eq!(result.unwrap(), Transition::Noop);
                } else {
                    assert_eq!(result.is_ok(), allowed.contains(to), "{from} -> {to}");
                }
            }
        }
    }

    #[test]
    fn end_before_start_rejected() {
        let period = NewPeriod {
            name: "Akreditasi 2025".to_string(),
            program: None,
            start_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 5, 1).unwrap(),
        };
        assert!(matches!(period.validate(), Err(Error::Validation(_))));
    }
}
