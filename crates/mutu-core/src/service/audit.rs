use chrono::Utc;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use super::{current_year, non_empty, today, ServiceContext};
use crate::code::{next_yearly_code, CodeFamily};
use crate::models::{
    AuditFinding, AuditPlan, AuditPlanStatus, AuditSchedule, FindingStatus, NewAuditFinding,
    NewAuditPlan, NewAuditSchedule, RtlStatus, ScheduleStatus, StatusCounts,
};
use crate::storage;
use crate::workflow::{ensure_transition, require, Status};
use crate::{ActorId, Error, Result};

#[derive(Debug, Clone, Serialize)]
pub struct AuditStatistics {
    pub plans: StatusCounts,
    pub findings: StatusCounts,
}

/// Audit plans, their schedules, and the findings they produce.
#[derive(Clone)]
pub struct AuditService {
    ctx: ServiceContext,
}

impl AuditService {
    pub const fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    // Plans

    pub async fn create_plan(&self, new: NewAuditPlan, actor: ActorId) -> Result<AuditPlan> {
        let plan = new.into_plan(actor)?;
        let mut tx = self.ctx.storage.begin().await?;
        storage::audit::insert_plan(&mut tx, &plan).await?;
        tx.commit().await?;

        info!(id = %plan.id, year = plan.year, "Audit plan created");
        Ok(plan)
    }

    pub async fn get_plan(&self, id: Uuid) -> Result<AuditPlan> {
        let mut conn = self.ctx.storage.acquire().await?;
        storage::audit::get_plan(&mut conn, id).await
    }

    pub async fn list_plans(&self) -> Result<Vec<AuditPlan>> {
        let mut conn = self.ctx.storage.acquire().await?;
        storage::audit::list_plans(&mut conn).await
    }

    /// Completing a plan requires every schedule to be settled.
    pub async fn change_plan_status(
        &self,
        id: Uuid,
        to: AuditPlanStatus,
        actor: ActorId,
    ) -> Result<AuditPlan> {
        let mut tx = self.ctx.storage.begin().await?;
        let mut plan = storage::audit::get_plan(&mut tx, id).await?;
        let from = plan.status;
        ensure_transition(from, to)?;

        let now = Utc::now();
        match to {
            AuditPlanStatus::Approved => {
                plan.approved_by = Some(actor);
                plan.approved_at = Some(now);
            }
            AuditPlanStatus::Completed => {
                let schedules = storage::audit::list_schedules(&mut tx, id).await?;
                let open = schedules.iter().filter(|s| !s.status.is_settled()).count();
                require(
                    from,
                    to,
                    open == 0,
                    format!("{open} schedules are neither completed nor cancelled"),
                )?;
                plan.completed_at = Some(now);
            }
            AuditPlanStatus::Draft | AuditPlanStatus::InProgress | AuditPlanStatus::Cancelled => {}
        }
        plan.status = to;
        plan.updated_at = now;
        storage::audit::update_plan(&mut tx, &plan).await?;
        tx.commit().await?;

        self.ctx.status_changed(id, from, to, Some(actor)).await;
        Ok(plan)
    }

    pub async fn add_schedule(&self, plan_id: Uuid, new: NewAuditSchedule) -> Result<AuditSchedule> {
        let unit = non_empty("unit", Some(new.unit))?;

        let mut tx = self.ctx.storage.begin().await?;
        let plan = storage::audit::get_plan(&mut tx, plan_id).await?;
        if plan.status.is_terminal() {
            return Err(Error::structural(format!(
                "audit plan {plan_id} is '{}' and takes no new schedules",
                plan.status
            )));
        }
        let now = Utc::now();
        let schedule = AuditSchedule {
            id: Uuid::new_v4(),
            plan_id,
            unit,
            scheduled_date: new.scheduled_date,
            auditor_id: new.auditor_id,
            status: ScheduleStatus::Scheduled,
            created_at: now,
            updated_at: now,
        };
        storage::audit::insert_schedule(&mut tx, &schedule).await?;
        tx.commit().await?;

        info!(id = %schedule.id, %plan_id, unit = %schedule.unit, "Audit scheduled");
        Ok(schedule)
    }

    pub async fn schedules(&self, plan_id: Uuid) -> Result<Vec<AuditSchedule>> {
        let mut conn = self.ctx.storage.acquire().await?;
        storage::audit::get_plan(&mut conn, plan_id).await?;
        storage::audit::list_schedules(&mut conn, plan_id).await
    }

    pub async fn change_schedule_status(
        &self,
        id: Uuid,
        to: ScheduleStatus,
        actor: ActorId,
    ) -> Result<AuditSchedule> {
        let mut tx = self.ctx.storage.begin().await?;
        let mut schedule = storage::audit::get_schedule(&mut tx, id).await?;
        let from = schedule.status;
        ensure_transition(from, to)?;

        schedule.status = to;
        schedule.updated_at = Utc::now();
        storage::audit::update_schedule(&mut tx, &schedule).await?;
        tx.commit().await?;

        self.ctx.status_changed(id, from, to, Some(actor)).await;
        Ok(schedule)
    }

    // Findings

    /// Records a finding. Without a due date it is due a category-specific
    /// number of days from today.
    pub async fn create_finding(&self, new: NewAuditFinding, actor: ActorId) -> Result<AuditFinding> {
        let mut tx = self.ctx.storage.begin().await?;
        if let Some(plan_id) = new.audit_plan_id {
            storage::audit::get_plan(&mut tx, plan_id).await?;
        }
        let code = next_yearly_code(&mut tx, CodeFamily::AuditFinding, current_year()).await?;
        let finding = new.into_finding(code, today(), &self.ctx.config, actor)?;
        storage::audit::insert_finding(&mut tx, &finding).await?;
        tx.commit().await?;

        info!(
            id = %finding.id,
            code = %finding.finding_code,
            category = %finding.category,
            due_date = %finding.due_date,
            "Audit finding recorded"
        );
        Ok(finding)
    }

    pub async fn get_finding(&self, id: Uuid) -> Result<AuditFinding> {
        let mut conn = self.ctx.storage.acquire().await?;
        storage::audit::get_finding(&mut conn, id).await
    }

    pub async fn list_findings(&self, status: Option<FindingStatus>) -> Result<Vec<AuditFinding>> {
        let mut conn = self.ctx.storage.acquire().await?;
        storage::audit::list_findings(&mut conn, status).await
    }

    /// Moves a finding to `to`.
    ///
    /// Resolving needs `resolution_notes`. Closing needs the finding's RTL,
    /// when there is one, to be completed.
    pub async fn change_finding_status(
        &self,
        id: Uuid,
        to: FindingStatus,
        resolution_notes: Option<String>,
        actor: ActorId,
    ) -> Result<AuditFinding> {
        let mut tx = self.ctx.storage.begin().await?;
        let mut finding = storage::audit::get_finding(&mut tx, id).await?;
        let from = finding.status;
        ensure_transition(from, to)?;

        let now = Utc::now();
        match to {
            FindingStatus::Resolved => {
                finding.resolution_notes = Some(non_empty("resolution_notes", resolution_notes)?);
                finding.resolved_at = Some(now);
            }
            FindingStatus::Verified => {
                finding.verified_by = Some(actor);
                finding.verified_at = Some(now);
            }
            FindingStatus::Closed => {
                if let Some(rtl) = storage::rtl::find_for_finding(&mut tx, id).await? {
                    require(
                        from,
                        to,
                        rtl.status == RtlStatus::Completed,
                        format!("RTL {} is '{}', not completed", rtl.rtl_code, rtl.status),
                    )?;
                }
                finding.closed_by = Some(actor);
                finding.closed_at = Some(now);
            }
            FindingStatus::Open | FindingStatus::InProgress => {}
        }
        finding.status = to;
        finding.updated_at = now;
        storage::audit::update_finding(&mut tx, &finding).await?;
        tx.commit().await?;

        self.ctx.status_changed(id, from, to, Some(actor)).await;
        Ok(finding)
    }

    pub async fn resolve_finding(
        &self,
        id: Uuid,
        resolution_notes: Option<String>,
        actor: ActorId,
    ) -> Result<AuditFinding> {
        self.change_finding_status(id, FindingStatus::Resolved, resolution_notes, actor)
            .await
    }

    pub async fn verify_finding(&self, id: Uuid, actor: ActorId) -> Result<AuditFinding> {
        self.change_finding_status(id, FindingStatus::Verified, None, actor)
            .await
    }

    pub async fn close_finding(&self, id: Uuid, actor: ActorId) -> Result<AuditFinding> {
        self.change_finding_status(id, FindingStatus::Closed, None, actor)
            .await
    }

    /// Only open findings without an RTL can be deleted.
    pub async fn delete_finding(&self, id: Uuid) -> Result<()> {
        let mut tx = self.ctx.storage.begin().await?;
        let finding = storage::audit::get_finding(&mut tx, id).await?;
        if finding.status != FindingStatus::Open {
            return Err(Error::structural(format!(
                "finding {} is '{}'; only open findings can be deleted",
                finding.finding_code, finding.status
            )));
        }
        if let Some(rtl) = storage::rtl::find_for_finding(&mut tx, id).await? {
            return Err(Error::structural(format!(
                "finding {} has RTL {}",
                finding.finding_code, rtl.rtl_code
            )));
        }
        storage::audit::delete_finding(&mut tx, id).await?;
        tx.commit().await?;

        info!(%id, code = %finding.finding_code, "Audit finding deleted");
        Ok(())
    }

    pub async fn statistics(&self) -> Result<AuditStatistics> {
        let mut conn = self.ctx.storage.acquire().await?;
        Ok(AuditStatistics {
            plans: storage::audit::plan_status_counts(&mut conn).await?,
            findings: storage::audit::finding_status_counts(&mut conn).await?,
        })
    }
}
