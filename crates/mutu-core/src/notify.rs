//! Domain events and their fire-and-forget delivery.
//!
//! Services emit events after their transaction commits. A notifier that
//! fails is logged and otherwise ignored; it never undoes the operation.

use chrono::NaiveDate;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{ActorId, Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    StatusChanged {
        entity: &'static str,
        id: Uuid,
        from: String,
        to: String,
        actor: Option<ActorId>,
    },
    ApprovalRequested {
        entity: &'static str,
        id: Uuid,
    },
    DeadlineApproaching {
        entity: &'static str,
        id: Uuid,
        due_date: NaiveDate,
    },
}

impl DomainEvent {
    pub const fn entity(&self) -> &'static str {
        match self {
            Self::StatusChanged { entity, .. }
            | Self::ApprovalRequested { entity, .. }
            | Self::DeadlineApproaching { entity, .. } => *entity,
        }
    }

    pub const fn id(&self) -> Uuid {
        match self {
            Self::StatusChanged { id, .. }
            | Self::ApprovalRequested { id, .. }
            | Self::DeadlineApproaching { id, .. } => *id,
        }
    }
}

#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: &DomainEvent) -> Result<()>;
}

/// Writes every event to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

#[async_trait::async_trait]
impl Notifier for TracingNotifier {
    async fn notify(&self, event: &DomainEvent) -> Result<()> {
        match event {
            DomainEvent::StatusChanged {
                entity,
                id,
                from,
                to,
                actor,
            } => {
                info!(entity = *entity, %id, %from, %to, actor = ?actor, "Status changed");
            }
            DomainEvent::ApprovalRequested { entity, id } => {
                info!(entity = *entity, %id, "Approval requested");
            }
            DomainEvent::DeadlineApproaching {
                entity,
                id,
                due_date,
            } => {
                info!(entity = *entity, %id, %due_date, "Deadline approaching");
            }
        }
        Ok(())
    }
}

/// Fans events out to in-process subscribers.
#[derive(Debug, Clone)]
pub struct BroadcastNotifier {
    tx: broadcast::Sender<DomainEvent>,
}

impl BroadcastNotifier {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.tx.subscribe()
    }
}

impl Default for BroadcastNotifier {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait::async_trait]
impl Notifier for BroadcastNotifier {
    async fn notify(&self, event: &DomainEvent) -> Result<()> {
        if self.tx.receiver_count() == 0 {
            return Ok(());
        }
        self.tx
            .send(event.clone())
            .map(|_| ())
            .map_err(|e| Error::Delivery(e.to_string()))
    }
}

/// Delivers `event`, logging instead of returning a delivery failure.
pub async fn dispatch(notifier: &dyn Notifier, event: DomainEvent) {
    if let Err(e) = notifier.notify(&event).await {
        warn!(entity = event.entity(), id = %event.id(), error = %e, "Notification not delivered");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingNotifier;

    #[async_trait::async_trait]
    impl Notifier for FailingNotifier {
        async fn notify(&self, _event: &DomainEvent) -> Result<()> {
            Err(Error::Delivery("mail server down".to_string()))
        }
    }

    fn approval() -> DomainEvent {
        DomainEvent::ApprovalRequested {
            entity: "RTL",
            id: Uuid::nil(),
        }
    }

    #[tokio::test]
    async fn subscribers_receive_events() {
        let notifier = BroadcastNotifier::default();
        let mut rx = notifier.subscribe();
        notifier.notify(&approval()).await.unwrap();
        assert_eq!(rx.recv().await.unwrap(), approval());
    }

    #[tokio::test]
    async fn no_subscribers_is_not_an_error() {
        assert!(BroadcastNotifier::new(4).notify(&approval()).await.is_ok());
    }

    #[tokio::test]
    async fn dispatch_swallows_delivery_failures() {
        dispatch(&FailingNotifier, approval()).await;
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let value = serde_json::to_value(approval()).unwrap();
        assert_eq!(value["type"], "approval_requested");
        assert_eq!(value["entity"], "RTL");
    }
}
