use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::{current_year, ServiceContext};
use crate::code::{next_yearly_code, CodeFamily};
use crate::error::ValidationErrors;
use crate::models::rtl::check_percentage;
use crate::models::{
    ActionItem, ActionStatus, NewActionItem, NewRtm, Rtm, RtmStatus, StatusCounts,
};
use crate::storage;
use crate::workflow::{ensure_transition, invalid, require, Status};
use crate::{ActorId, Error, Result};

/// What a management review concluded. Both parts are needed to complete it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RtmOutcome {
    #[serde(default)]
    pub decisions: Option<String>,
    #[serde(default)]
    pub minutes: Option<String>,
}

impl RtmOutcome {
    fn into_parts(self) -> Result<(String, String)> {
        let trimmed = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        let decisions = trimmed(self.decisions);
        let minutes = trimmed(self.minutes);

        let mut errors = ValidationErrors::new();
        if decisions.is_none() {
            errors.add("decisions", "decisions are required to complete the meeting");
        }
        if minutes.is_none() {
            errors.add("minutes", "minutes are required to complete the meeting");
        }
        match (decisions, minutes) {
            (Some(d), Some(m)) => Ok((d, m)),
            _ => Err(Error::Validation(errors)),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RtmStatistics {
    pub meetings: StatusCounts,
    pub action_items: StatusCounts,
}

/// Management review meetings and their action items.
#[derive(Clone)]
pub struct RtmService {
    ctx: ServiceContext,
}

impl RtmService {
    pub const fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    pub async fn create(&self, new: NewRtm, actor: ActorId) -> Result<Rtm> {
        let mut tx = self.ctx.storage.begin().await?;
        let code = next_yearly_code(&mut tx, CodeFamily::Rtm, current_year()).await?;
        let rtm = new.into_rtm(code, actor)?;
        storage::rtm::insert(&mut tx, &rtm).await?;
        tx.commit().await?;

        info!(id = %rtm.id, code = %rtm.rtm_code, date = %rtm.meeting_date, "RTM planned");
        Ok(rtm)
    }

    pub async fn get(&self, id: Uuid) -> Result<Rtm> {
        let mut conn = self.ctx.storage.acquire().await?;
        storage::rtm::get(&mut conn, id).await
    }

    pub async fn list(&self, status: Option<RtmStatus>) -> Result<Vec<Rtm>> {
        let mut conn = self.ctx.storage.acquire().await?;
        storage::rtm::list(&mut conn, status).await
    }

    pub async fn start(&self, id: Uuid, actor: ActorId) -> Result<Rtm> {
        let mut tx = self.ctx.storage.begin().await?;
        let mut rtm = storage::rtm::get(&mut tx, id).await?;
        let from = rtm.status;
        let to = RtmStatus::Ongoing;
        ensure_transition(from, to)?;

        let now = Utc::now();
        rtm.status = to;
        rtm.started_at = Some(now);
        rtm.updated_at = now;
        storage::rtm::update(&mut tx, &rtm).await?;
        tx.commit().await?;

        self.ctx.status_changed(id, from, to, Some(actor)).await;
        Ok(rtm)
    }

    pub async fn complete(&self, id: Uuid, outcome: RtmOutcome, actor: ActorId) -> Result<Rtm> {
        let mut tx = self.ctx.storage.begin().await?;
        let mut rtm = storage::rtm::get(&mut tx, id).await?;
        let from = rtm.status;
        let to = RtmStatus::Completed;
        ensure_transition(from, to)?;
        let (decisions, minutes) = outcome.into_parts()?;

        let now = Utc::now();
        rtm.status = to;
        rtm.decisions = Some(decisions);
        rtm.minutes = Some(minutes);
        rtm.completed_at = Some(now);
        rtm.updated_at = now;
        storage::rtm::update(&mut tx, &rtm).await?;
        tx.commit().await?;

        self.ctx.status_changed(id, from, to, Some(actor)).await;
        Ok(rtm)
    }

    pub async fn cancel(&self, id: Uuid, actor: ActorId) -> Result<Rtm> {
        let mut tx = self.ctx.storage.begin().await?;
        let mut rtm = storage::rtm::get(&mut tx, id).await?;
        let from = rtm.status;
        let to = RtmStatus::Cancelled;
        ensure_transition(from, to)?;

        rtm.status = to;
        rtm.updated_at = Utc::now();
        storage::rtm::update(&mut tx, &rtm).await?;
        tx.commit().await?;

        self.ctx.status_changed(id, from, to, Some(actor)).await;
        Ok(rtm)
    }

    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let mut tx = self.ctx.storage.begin().await?;
        let rtm = storage::rtm::get(&mut tx, id).await?;
        let items = storage::rtm::action_count(&mut tx, id).await?;
        if items > 0 {
            return Err(Error::structural(format!(
                "RTM {} has {items} action items",
                rtm.rtm_code
            )));
        }
        storage::rtm::delete(&mut tx, id).await?;
        tx.commit().await?;

        info!(%id, code = %rtm.rtm_code, "RTM deleted");
        Ok(())
    }

    // Action items

    pub async fn add_action(&self, rtm_id: Uuid, new: NewActionItem) -> Result<ActionItem> {
        let mut tx = self.ctx.storage.begin().await?;
        let rtm = storage::rtm::get(&mut tx, rtm_id).await?;
        if rtm.status.is_terminal() {
            return Err(Error::structural(format!(
                "RTM {} is '{}' and takes no new action items",
                rtm.rtm_code, rtm.status
            )));
        }
        let code = next_yearly_code(&mut tx, CodeFamily::RtmAction, current_year()).await?;
        let item = new.into_item(rtm_id, code)?;
        storage::rtm::insert_action(&mut tx, &item).await?;
        tx.commit().await?;

        info!(id = %item.id, code = %item.action_code, rtm = %rtm.rtm_code, "RTM action item added");
        Ok(item)
    }

    pub async fn actions(&self, rtm_id: Uuid) -> Result<Vec<ActionItem>> {
        let mut conn = self.ctx.storage.acquire().await?;
        storage::rtm::get(&mut conn, rtm_id).await?;
        storage::rtm::list_actions(&mut conn, rtm_id).await
    }

    pub async fn start_action(&self, id: Uuid, actor: ActorId) -> Result<ActionItem> {
        self.action_transition(id, ActionStatus::InProgress, actor)
            .await
    }

    pub async fn cancel_action(&self, id: Uuid, actor: ActorId) -> Result<ActionItem> {
        self.action_transition(id, ActionStatus::Cancelled, actor)
            .await
    }

    /// Completing an item requires it to be fully done.
    pub async fn complete_action(&self, id: Uuid, actor: ActorId) -> Result<ActionItem> {
        self.action_transition(id, ActionStatus::Completed, actor)
            .await
    }

    pub async fn update_action_progress(
        &self,
        id: Uuid,
        percentage: f64,
        actor: ActorId,
    ) -> Result<ActionItem> {
        let percentage = check_percentage("completion_percentage", percentage)?;

        let mut tx = self.ctx.storage.begin().await?;
        let mut item = storage::rtm::get_action(&mut tx, id).await?;
        if item.status.is_terminal() {
            return Err(invalid(
                item.status,
                ActionStatus::InProgress,
                "progress cannot change on a closed action item",
            ));
        }
        item.completion_percentage = percentage;
        item.updated_at = Utc::now();
        storage::rtm::update_action(&mut tx, &item).await?;
        tx.commit().await?;

        info!(%id, %actor, percentage, "RTM action progress updated");
        Ok(item)
    }

    pub async fn delete_action(&self, id: Uuid) -> Result<()> {
        let mut tx = self.ctx.storage.begin().await?;
        storage::rtm::delete_action(&mut tx, id).await?;
        tx.commit().await?;

        info!(%id, "RTM action item deleted");
        Ok(())
    }

    /// Mean completion of an RTM's live action items.
    pub async fn progress(&self, rtm_id: Uuid) -> Result<f64> {
        let mut conn = self.ctx.storage.acquire().await?;
        storage::rtm::get(&mut conn, rtm_id).await?;
        storage::rtm::average_action_completion(&mut conn, rtm_id).await
    }

    pub async fn statistics(&self) -> Result<RtmStatistics> {
        let mut conn = self.ctx.storage.acquire().await?;
        Ok(RtmStatistics {
            meetings: storage::rtm::count_by_status(&mut conn).await?,
            action_items: storage::rtm::action_status_counts(&mut conn).await?,
        })
    }

    async fn action_transition(
        &self,
        id: Uuid,
        to: ActionStatus,
        actor: ActorId,
    ) -> Result<ActionItem> {
        let mut tx = self.ctx.storage.begin().await?;
        let mut item = storage::rtm::get_action(&mut tx, id).await?;
        let from = item.status;
        ensure_transition(from, to)?;

        let now = Utc::now();
        if to == ActionStatus::Completed {
            #[allow(clippy::float_cmp)]
            let done = item.completion_percentage == 100.0;
            require(from, to, done, "completion percentage must be 100%")?;
            item.completed_at = Some(now);
        }
        item.status = to;
        item.updated_at = now;
        storage::rtm::update_action(&mut tx, &item).await?;
        tx.commit().await?;

        self.ctx.status_changed(id, from, to, Some(actor)).await;
        Ok(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_reports_every_missing_part() {
        let err = RtmOutcome {
            decisions: Some("  ".to_string()),
            minutes: None,
        }
        .into_parts()
        .unwrap_err();
        match err {
            Error::Validation(errors) => {
                assert!(errors.contains("decisions"));
                assert!(errors.contains("minutes"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn outcome_is_trimmed() {
        let (decisions, minutes) = RtmOutcome {
            decisions: Some(" Tambah dosen ".to_string()),
            minutes: Some("Notulen".to_string()),
        }
        .into_parts()
        .unwrap();
        assert_eq!(decisions, "Tambah dosen");
        assert_eq!(minutes, "Notulen");
    }
}
