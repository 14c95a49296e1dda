use chrono::{Days, NaiveDate};
use tracing::info;

use super::ServiceContext;
use crate::models::{ActionStatus, FindingStatus, RtlStatus};
use crate::notify::DomainEvent;
use crate::storage;
use crate::workflow::Status;
use crate::Result;

/// Finds work that is due soon or overdue and announces it.
#[derive(Clone)]
pub struct DeadlineService {
    ctx: ServiceContext,
}

impl DeadlineService {
    pub const fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    /// Emits a deadline event for every open finding, unfinished RTL and
    /// open action item due on or before `today + horizon_days`. Overdue
    /// items are included.
    pub async fn scan(&self, today: NaiveDate, horizon_days: u64) -> Result<Vec<DomainEvent>> {
        let until = today
            .checked_add_days(Days::new(horizon_days))
            .unwrap_or(NaiveDate::MAX);

        let mut events = Vec::new();
        {
            let mut conn = self.ctx.storage.acquire().await?;
            for finding in storage::audit::open_findings_due(&mut conn, until).await? {
                events.push(DomainEvent::DeadlineApproaching {
                    entity: FindingStatus::ENTITY,
                    id: finding.id,
                    due_date: finding.due_date,
                });
            }
            for rtl in storage::rtl::active_due(&mut conn, until).await? {
                if let Some(due_date) = rtl.target_date {
                    events.push(DomainEvent::DeadlineApproaching {
                        entity: RtlStatus::ENTITY,
                        id: rtl.id,
                        due_date,
                    });
                }
            }
            for item in storage::rtm::open_actions_due(&mut conn, until).await? {
                if let Some(due_date) = item.due_date {
                    events.push(DomainEvent::DeadlineApproaching {
                        entity: ActionStatus::ENTITY,
                        id: item.id,
                        due_date,
                    });
                }
            }
        }

        info!(%today, %until, due = events.len(), "Deadline scan finished");
        for event in &events {
            self.ctx.notify(event.clone()).await;
        }
        Ok(events)
    }
}
