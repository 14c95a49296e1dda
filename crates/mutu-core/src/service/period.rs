use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use super::ServiceContext;
use crate::models::{AccreditationPeriod, NewPeriod, PeriodStatus, StatusCounts};
use crate::storage;
use crate::workflow::{ensure_transition, Transition};
use crate::{ActorId, Error, Result};

/// A period with its submission progress.
#[derive(Debug, Clone, Serialize)]
pub struct PeriodSummary {
    pub period: AccreditationPeriod,
    pub submissions: i64,
    pub average_completion: f64,
}

#[derive(Clone)]
pub struct PeriodService {
    ctx: ServiceContext,
}

impl PeriodService {
    pub const fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    pub async fn create(&self, new: NewPeriod, actor: ActorId) -> Result<AccreditationPeriod> {
        new.validate()?;
        let period = new.into_period(actor);

        let mut tx = self.ctx.storage.begin().await?;
        storage::period::insert(&mut tx, &period).await?;
        tx.commit().await?;

        info!(id = %period.id, name = %period.name, "Accreditation period created");
        Ok(period)
    }

    pub async fn get(&self, id: Uuid) -> Result<AccreditationPeriod> {
        let mut conn = self.ctx.storage.acquire().await?;
        storage::period::get(&mut conn, id).await
    }

    pub async fn list(&self, status: Option<PeriodStatus>) -> Result<Vec<AccreditationPeriod>> {
        let mut conn = self.ctx.storage.acquire().await?;
        storage::period::list(&mut conn, status).await
    }

    /// Moves the period to `to`. Requesting the current status returns the
    /// period untouched.
    pub async fn change_status(
        &self,
        id: Uuid,
        to: PeriodStatus,
        actor: ActorId,
    ) -> Result<AccreditationPeriod> {
        let mut tx = self.ctx.storage.begin().await?;
        let period = storage::period::get(&mut tx, id).await?;
        let from = period.status;

        if ensure_transition(from, to)? == Transition::Noop {
            return Ok(period);
        }

        storage::period::update_status(&mut tx, id, to).await?;
        let period = storage::period::get(&mut tx, id).await?;
        tx.commit().await?;

        self.ctx.status_changed(id, from, to, Some(actor)).await;
        Ok(period)
    }

    /// Only untouched periods can go: still in preparation, no submissions.
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let mut tx = self.ctx.storage.begin().await?;
        let period = storage::period::get(&mut tx, id).await?;
        if period.status != PeriodStatus::Persiapan {
            return Err(Error::structural(format!(
                "period {id} is '{}'; only periods in preparation can be deleted",
                period.status
            )));
        }
        let submissions = storage::submission::count_for_period(&mut tx, id).await?;
        if submissions > 0 {
            return Err(Error::structural(format!(
                "period {id} has {submissions} submissions"
            )));
        }
        storage::period::delete(&mut tx, id).await?;
        tx.commit().await?;

        info!(%id, "Accreditation period deleted");
        Ok(())
    }

    pub async fn summary(&self, id: Uuid) -> Result<PeriodSummary> {
        let mut conn = self.ctx.storage.acquire().await?;
        let period = storage::period::get(&mut conn, id).await?;
        let submissions = storage::submission::count_for_period(&mut conn, id).await?;
        let average_completion = storage::submission::average_completion(&mut conn, id).await?;
        Ok(PeriodSummary {
            period,
            submissions,
            average_completion,
        })
    }

    pub async fn statistics(&self) -> Result<StatusCounts> {
        let mut conn = self.ctx.storage.acquire().await?;
        storage::period::count_by_status(&mut conn).await
    }
}
