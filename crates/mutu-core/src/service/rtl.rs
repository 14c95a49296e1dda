use chrono::Utc;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use super::{current_year, ServiceContext};
use crate::code::{next_yearly_code, CodeFamily};
use crate::models::rtl::check_percentage;
use crate::models::{
    NewRtl, Rtl, RtlStatus, StatusCounts, VerificationOutcome, VerificationStatus,
};
use crate::storage;
use crate::workflow::{ensure_transition, invalid, require, Status};
use crate::{ActorId, Error, Result};

#[derive(Debug, Clone, Serialize)]
pub struct RtlStatistics {
    pub by_status: StatusCounts,
    pub average_completion: f64,
}

/// Corrective action plans and their verification.
#[derive(Clone)]
pub struct RtlService {
    ctx: ServiceContext,
}

impl RtlService {
    pub const fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    /// Opens the RTL of a finding. A caller-chosen code must be unused;
    /// otherwise the next code of the year is generated.
    pub async fn create(&self, mut new: NewRtl, actor: ActorId) -> Result<Rtl> {
        let mut tx = self.ctx.storage.begin().await?;
        let finding = storage::audit::get_finding(&mut tx, new.finding_id).await?;
        if let Some(existing) = storage::rtl::find_for_finding(&mut tx, finding.id).await? {
            return Err(Error::DuplicateKey {
                field: "finding_id",
                value: format!("{} (RTL {})", finding.finding_code, existing.rtl_code),
            });
        }

        let code = match new.rtl_code.take().map(|c| c.trim().to_string()) {
            Some(code) if !code.is_empty() => {
                if storage::rtl::code_exists(&mut tx, &code).await? {
                    return Err(Error::DuplicateKey {
                        field: "rtl_code",
                        value: code,
                    });
                }
                code
            }
            _ => next_yearly_code(&mut tx, CodeFamily::Rtl, current_year()).await?,
        };

        let rtl = new.into_rtl(code, actor)?;
        storage::rtl::insert(&mut tx, &rtl).await?;
        tx.commit().await?;

        info!(id = %rtl.id, code = %rtl.rtl_code, finding = %finding.finding_code, "RTL created");
        Ok(rtl)
    }

    pub async fn get(&self, id: Uuid) -> Result<Rtl> {
        let mut conn = self.ctx.storage.acquire().await?;
        storage::rtl::get(&mut conn, id).await
    }

    pub async fn list(&self, status: Option<RtlStatus>) -> Result<Vec<Rtl>> {
        let mut conn = self.ctx.storage.acquire().await?;
        storage::rtl::list(&mut conn, status).await
    }

    pub async fn start(&self, id: Uuid, actor: ActorId) -> Result<Rtl> {
        let mut tx = self.ctx.storage.begin().await?;
        let mut rtl = storage::rtl::get(&mut tx, id).await?;
        let from = rtl.status;
        let to = RtlStatus::InProgress;
        ensure_transition(from, to)?;
        require(
            from,
            to,
            from == RtlStatus::NotStarted,
            "only a not started RTL can be started",
        )?;

        let now = Utc::now();
        rtl.status = to;
        rtl.started_at = Some(now);
        rtl.updated_at = now;
        storage::rtl::update(&mut tx, &rtl).await?;
        tx.commit().await?;

        self.ctx.status_changed(id, from, to, Some(actor)).await;
        Ok(rtl)
    }

    /// Records progress on an RTL that is being worked on.
    pub async fn update_progress(&self, id: Uuid, percentage: f64, actor: ActorId) -> Result<Rtl> {
        let percentage = check_percentage("completion_percentage", percentage)?;

        let mut tx = self.ctx.storage.begin().await?;
        let mut rtl = storage::rtl::get(&mut tx, id).await?;
        if rtl.status != RtlStatus::InProgress {
            return Err(invalid(
                rtl.status,
                RtlStatus::InProgress,
                "progress can only be recorded while the RTL is in progress",
            ));
        }
        let previous = rtl.completion_percentage;
        rtl.completion_percentage = percentage;
        rtl.updated_at = Utc::now();
        storage::rtl::update(&mut tx, &rtl).await?;
        tx.commit().await?;

        info!(%id, %actor, from = previous, to = percentage, "RTL progress updated");
        Ok(rtl)
    }

    /// Marks a fully done RTL completed and asks for its verification.
    pub async fn complete(&self, id: Uuid, actor: ActorId) -> Result<Rtl> {
        let mut tx = self.ctx.storage.begin().await?;
        let mut rtl = storage::rtl::get(&mut tx, id).await?;
        let from = rtl.status;
        let to = RtlStatus::Completed;
        ensure_transition(from, to)?;
        #[allow(clippy::float_cmp)]
        let done = rtl.completion_percentage == 100.0;
        require(from, to, done, "completion percentage must be 100%")?;
        ensure_transition(rtl.verification_status, VerificationStatus::Pending)?;

        let now = Utc::now();
        rtl.status = to;
        rtl.completed_at = Some(now);
        rtl.verification_status = VerificationStatus::Pending;
        rtl.updated_at = now;
        storage::rtl::update(&mut tx, &rtl).await?;
        tx.commit().await?;

        self.ctx.status_changed(id, from, to, Some(actor)).await;
        self.ctx.approval_requested(RtlStatus::ENTITY, id).await;
        Ok(rtl)
    }

    /// Applies a verification outcome. Rejection and revision send the RTL
    /// back to work.
    pub async fn verify(
        &self,
        id: Uuid,
        outcome: VerificationOutcome,
        notes: Option<String>,
        actor: ActorId,
    ) -> Result<Rtl> {
        let mut tx = self.ctx.storage.begin().await?;
        let mut rtl = storage::rtl::get(&mut tx, id).await?;
        let from = rtl.verification_status;
        let to = outcome.status();
        ensure_transition(from, to)?;
        require(
            from,
            to,
            rtl.status == RtlStatus::Completed,
            format!("RTL is '{}', not completed", rtl.status),
        )?;

        let previous = rtl.status;
        let now = Utc::now();
        rtl.verification_status = to;
        rtl.verification_notes = notes;
        rtl.verified_by = Some(actor);
        rtl.verified_at = Some(now);
        if outcome.reopens() {
            ensure_transition(previous, RtlStatus::InProgress)?;
            rtl.status = RtlStatus::InProgress;
            rtl.completed_at = None;
        }
        rtl.updated_at = now;
        storage::rtl::update(&mut tx, &rtl).await?;
        tx.commit().await?;

        self.ctx.status_changed(id, from, to, Some(actor)).await;
        if rtl.status != previous {
            self.ctx.status_changed(id, previous, rtl.status, Some(actor)).await;
        }
        Ok(rtl)
    }

    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let mut tx = self.ctx.storage.begin().await?;
        let rtl = storage::rtl::get(&mut tx, id).await?;
        if rtl.status != RtlStatus::NotStarted {
            return Err(Error::structural(format!(
                "RTL {} is '{}'; only not started RTLs can be deleted",
                rtl.rtl_code, rtl.status
            )));
        }
        storage::rtl::delete(&mut tx, id).await?;
        tx.commit().await?;

        info!(%id, code = %rtl.rtl_code, "RTL deleted");
        Ok(())
    }

    pub async fn statistics(&self) -> Result<RtlStatistics> {
        let mut conn = self.ctx.storage.acquire().await?;
        Ok(RtlStatistics {
            by_status: storage::rtl::count_by_status(&mut conn).await?,
            average_completion: storage::rtl::average_completion(&mut conn).await?,
        })
    }
}
