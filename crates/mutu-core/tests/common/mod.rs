#![allow(dead_code)]

use std::sync::Arc;

use chrono::NaiveDate;
use mutu_core::models::{
    AccreditationPeriod, Criterion, CriterionMetadata, CriterionSubmission, NewCriterion,
    NewPeriod, NewSubmission,
};
use mutu_core::{ActorId, BroadcastNotifier, LocalFileStore, ServiceContext, Services, Storage};
use tempfile::TempDir;
use uuid::Uuid;

pub struct Harness {
    pub services: Services,
    pub storage: Storage,
    pub events: Arc<BroadcastNotifier>,
    pub files: Arc<LocalFileStore>,
    pub actor: ActorId,
    _dir: TempDir,
}

pub async fn harness() -> Harness {
    let storage = Storage::open_memory().await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    let files = Arc::new(LocalFileStore::new(dir.path()));
    let events = Arc::new(BroadcastNotifier::default());
    let ctx = ServiceContext::new(storage.clone()).with_notifier(events.clone());
    Harness {
        services: Services::new(&ctx, files.clone()),
        storage,
        events,
        files,
        actor: ActorId::new(Uuid::new_v4()),
        _dir: dir,
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

impl Harness {
    pub async fn period(&self) -> AccreditationPeriod {
        self.services
            .periods
            .create(
                NewPeriod {
                    name: "Akreditasi 2025".to_string(),
                    program: Some("Informatika".to_string()),
                    start_date: date(2025, 1, 1),
                    end_date: date(2025, 12, 31),
                },
                self.actor,
            )
            .await
            .unwrap()
    }

    pub async fn criterion(&self, kode: &str, parent_id: Option<Uuid>) -> Criterion {
        self.criterion_with(kode, parent_id, CriterionMetadata::default())
            .await
    }

    pub async fn criterion_with(
        &self,
        kode: &str,
        parent_id: Option<Uuid>,
        metadata: CriterionMetadata,
    ) -> Criterion {
        self.services
            .criteria
            .create(NewCriterion {
                kode: kode.to_string(),
                name: format!("Butir {kode}"),
                description: None,
                parent_id,
                period_id: None,
                weight: Some(1.0),
                display_order: 0,
                metadata,
            })
            .await
            .unwrap()
    }

    pub async fn submission(
        &self,
        period: &AccreditationPeriod,
        criterion: &Criterion,
        content: Option<&str>,
    ) -> CriterionSubmission {
        self.services
            .submissions
            .create(
                NewSubmission {
                    period_id: period.id,
                    criterion_id: criterion.id,
                    content: content.map(str::to_string),
                    form_data: None,
                    is_complete: None,
                },
                self.actor,
            )
            .await
            .unwrap()
    }
}
