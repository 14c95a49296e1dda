use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use super::{current_year, ServiceContext};
use crate::code::{next_indicator_code, next_yearly_code, CodeFamily};
use crate::models::{
    IndicatorMonitoring, NewIndicator, NewMonitoring, NewStandard, SpmiIndicator, SpmiStandard,
    StandardStatus, StatusCounts,
};
use crate::storage;
use crate::workflow::ensure_transition;
use crate::{ActorId, Error, Result};

/// Internal quality standards, their indicators and indicator monitoring.
#[derive(Clone)]
pub struct SpmiService {
    ctx: ServiceContext,
}

impl SpmiService {
    pub const fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    pub async fn create_standard(&self, new: NewStandard, actor: ActorId) -> Result<SpmiStandard> {
        let mut tx = self.ctx.storage.begin().await?;
        let code = next_yearly_code(&mut tx, CodeFamily::Standard, current_year()).await?;
        let standard = new.into_standard(code, actor)?;
        storage::spmi::insert_standard(&mut tx, &standard).await?;
        tx.commit().await?;

        info!(id = %standard.id, code = %standard.code, "SPMI standard drafted");
        Ok(standard)
    }

    pub async fn get_standard(&self, id: Uuid) -> Result<SpmiStandard> {
        let mut conn = self.ctx.storage.acquire().await?;
        storage::spmi::get_standard(&mut conn, id).await
    }

    pub async fn list_standards(&self) -> Result<Vec<SpmiStandard>> {
        let mut conn = self.ctx.storage.acquire().await?;
        storage::spmi::list_standards(&mut conn).await
    }

    /// Activates a draft or revised standard.
    pub async fn approve(&self, id: Uuid, actor: ActorId) -> Result<SpmiStandard> {
        self.transition(id, StandardStatus::Active, actor).await
    }

    /// Reopens an active standard as a new version.
    pub async fn revise(&self, id: Uuid, actor: ActorId) -> Result<SpmiStandard> {
        self.transition(id, StandardStatus::Revision, actor).await
    }

    pub async fn deactivate(&self, id: Uuid, actor: ActorId) -> Result<SpmiStandard> {
        self.transition(id, StandardStatus::Inactive, actor).await
    }

    pub async fn delete_standard(&self, id: Uuid) -> Result<()> {
        let mut tx = self.ctx.storage.begin().await?;
        let standard = storage::spmi::get_standard(&mut tx, id).await?;
        let indicators = storage::spmi::indicator_count(&mut tx, id).await?;
        if indicators > 0 {
            return Err(Error::structural(format!(
                "standard {} has {indicators} indicators",
                standard.code
            )));
        }
        storage::spmi::delete_standard(&mut tx, id).await?;
        tx.commit().await?;

        info!(%id, code = %standard.code, "SPMI standard deleted");
        Ok(())
    }

    // Indicators

    pub async fn add_indicator(
        &self,
        standard_id: Uuid,
        new: NewIndicator,
    ) -> Result<SpmiIndicator> {
        let mut tx = self.ctx.storage.begin().await?;
        let standard = storage::spmi::get_standard(&mut tx, standard_id).await?;
        if standard.status == StandardStatus::Inactive {
            return Err(Error::structural(format!(
                "standard {} is inactive and takes no new indicators",
                standard.code
            )));
        }
        let code = next_indicator_code(&mut tx, &new.category).await?;
        let indicator = new.into_indicator(standard_id, code)?;
        storage::spmi::insert_indicator(&mut tx, &indicator).await?;
        tx.commit().await?;

        info!(id = %indicator.id, code = %indicator.code, standard = %standard.code, "SPMI indicator added");
        Ok(indicator)
    }

    pub async fn indicators(&self, standard_id: Uuid) -> Result<Vec<SpmiIndicator>> {
        let mut conn = self.ctx.storage.acquire().await?;
        storage::spmi::get_standard(&mut conn, standard_id).await?;
        storage::spmi::list_indicators(&mut conn, standard_id).await
    }

    pub async fn delete_indicator(&self, id: Uuid) -> Result<()> {
        let mut tx = self.ctx.storage.begin().await?;
        storage::spmi::delete_indicator(&mut tx, id).await?;
        tx.commit().await?;

        info!(%id, "SPMI indicator deleted");
        Ok(())
    }

    // Monitoring

    /// Records a measurement. Achievement and attention status are derived
    /// from the actual value and the target.
    pub async fn record_monitoring(
        &self,
        indicator_id: Uuid,
        new: NewMonitoring,
        actor: ActorId,
    ) -> Result<IndicatorMonitoring> {
        if new.period_label.trim().is_empty() {
            return Err(Error::validation("period_label", "period label is required"));
        }

        let mut tx = self.ctx.storage.begin().await?;
        let indicator = storage::spmi::get_indicator(&mut tx, indicator_id).await?;
        let code = next_yearly_code(&mut tx, CodeFamily::Monitoring, current_year()).await?;
        let monitoring = new.into_monitoring(&indicator, code, actor);
        storage::spmi::insert_monitoring(&mut tx, &monitoring).await?;
        tx.commit().await?;

        if monitoring.attention.needs_attention() {
            warn!(
                indicator = %indicator.code,
                achievement = monitoring.achievement,
                attention = %monitoring.attention,
                "Indicator needs attention"
            );
        } else {
            info!(
                indicator = %indicator.code,
                achievement = monitoring.achievement,
                attention = %monitoring.attention,
                "Indicator monitored"
            );
        }
        Ok(monitoring)
    }

    pub async fn monitorings(&self, indicator_id: Uuid) -> Result<Vec<IndicatorMonitoring>> {
        let mut conn = self.ctx.storage.acquire().await?;
        storage::spmi::get_indicator(&mut conn, indicator_id).await?;
        storage::spmi::list_monitorings(&mut conn, indicator_id).await
    }

    /// Latest measurements that are at warning or critical level.
    pub async fn needing_attention(&self) -> Result<Vec<IndicatorMonitoring>> {
        let mut conn = self.ctx.storage.acquire().await?;
        storage::spmi::needing_attention(&mut conn).await
    }

    pub async fn statistics(&self) -> Result<StatusCounts> {
        let mut conn = self.ctx.storage.acquire().await?;
        storage::spmi::standard_status_counts(&mut conn).await
    }

    async fn transition(
        &self,
        id: Uuid,
        to: StandardStatus,
        actor: ActorId,
    ) -> Result<SpmiStandard> {
        let mut tx = self.ctx.storage.begin().await?;
        let mut standard = storage::spmi::get_standard(&mut tx, id).await?;
        let from = standard.status;
        ensure_transition(from, to)?;

        let now = Utc::now();
        match to {
            StandardStatus::Active => {
                standard.approved_by = Some(actor);
                standard.approved_at = Some(now);
            }
            StandardStatus::Revision => {
                standard.version += 1;
                standard.approved_by = None;
                standard.approved_at = None;
            }
            StandardStatus::Draft | StandardStatus::Inactive => {}
        }
        standard.status = to;
        standard.updated_at = now;
        storage::spmi::update_standard(&mut tx, &standard).await?;
        tx.commit().await?;

        self.ctx.status_changed(id, from, to, Some(actor)).await;
        Ok(standard)
    }
}
