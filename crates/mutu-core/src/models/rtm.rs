use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::workflow::Status;
use crate::{ActorId, Error, Result};

string_enum! {
    pub enum RtmStatus {
        Planned => "planned",
        Ongoing => "ongoing",
        Completed => "completed",
        Cancelled => "cancelled",
    }
}

impl Status for RtmStatus {
    const ENTITY: &'static str = "RTM";

    fn allowed_next(self) -> &'static [Self] {
        match self {
            Self::Planned => &[Self::Ongoing, Self::Cancelled],
            Self::Ongoing => &[Self::Completed, Self::Cancelled],
            Self::Completed | Self::Cancelled => &[],
        }
    }
}

string_enum! {
    pub enum ActionStatus {
        NotStarted => "not_started",
        InProgress => "in_progress",
        Completed => "completed",
        Cancelled => "cancelled",
    }
}

impl Status for ActionStatus {
    const ENTITY: &'static str = "RTMActionItem";

    fn allowed_next(self) -> &'static [Self] {
        match self {
            Self::NotStarted => &[Self::InProgress, Self::Completed, Self::Cancelled],
            Self::InProgress => &[Self::Completed, Self::Cancelled],
            Self::Completed | Self::Cancelled => &[],
        }
    }
}

/// Management review meeting ("rapat tinjauan manajemen").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rtm {
    pub id: Uuid,
    pub rtm_code: String,
    pub title: String,
    pub meeting_date: NaiveDate,
    pub agenda: Option<String>,
    pub status: RtmStatus,
    pub decisions: Option<String>,
    pub minutes: Option<String>,
    pub chair_id: Option<ActorId>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_by: Option<ActorId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewRtm {
    pub title: String,
    pub meeting_date: NaiveDate,
    #[serde(default)]
    pub agenda: Option<String>,
    #[serde(default)]
    pub chair_id: Option<ActorId>,
}

impl NewRtm {
    pub fn into_rtm(self, rtm_code: String, actor: ActorId) -> Result<Rtm> {
        if self.title.trim().is_empty() {
            return Err(Error::validation("title", "title is required"));
        }
        let now = Utc::now();
        Ok(Rtm {
            id: Uuid::new_v4(),
            rtm_code,
            title: self.title.trim().to_string(),
            meeting_date: self.meeting_date,
            agenda: self.agenda,
            status: RtmStatus::Planned,
            decisions: None,
            minutes: None,
            chair_id: self.chair_id,
            started_at: None,
            completed_at: None,
            created_by: Some(actor),
            created_at: now,
            updated_at: now,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionItem {
    pub id: Uuid,
    pub action_code: String,
    pub rtm_id: Uuid,
    pub description: String,
    pub pic_id: Option<ActorId>,
    pub due_date: Option<NaiveDate>,
    pub status: ActionStatus,
    pub completion_percentage: f64,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewActionItem {
    pub description: String,
    #[serde(default)]
    pub pic_id: Option<ActorId>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
}

impl NewActionItem {
    pub fn into_item(self, rtm_id: Uuid, action_code: String) -> Result<ActionItem> {
        if self.description.trim().is_empty() {
            return Err(Error::validation("description", "description is required"));
        }
        let now = Utc::now();
        Ok(ActionItem {
            id: Uuid::new_v4(),
            action_code,
            rtm_id,
            description: self.description,
            pic_id: self.pic_id,
            due_date: self.due_date,
            status: ActionStatus::NotStarted,
            completion_percentage: 0.0,
            completed_at: None,
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
    fn rtm_must_run_before_completion() {
        assert!(ensure_transition(RtmStatus::Planned, RtmStatus::Completed).is_err());
        assert!(ensure_transition(RtmStatus::Ongoing, RtmStatus::Completed).is_ok());
    }

    #[test]
    fn action_item_can_complete_without_starting() {
        assert!(ensure_transition(ActionStatus::NotStarted, ActionStatus::Completed).is_ok());
        assert!(ActionStatus::Cancelled.is_terminal());
    }
}
