use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use super::ServiceContext;
use crate::models::{build_tree, Criterion, CriterionNode, CriterionUpdate, NewCriterion};
use crate::storage;
use crate::{Error, Result};

#[derive(Clone)]
pub struct CriterionService {
    ctx: ServiceContext,
}

impl CriterionService {
    pub const fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    pub async fn create(&self, new: NewCriterion) -> Result<Criterion> {
        new.validate()?;
        let criterion = new.into_criterion();

        let mut tx = self.ctx.storage.begin().await?;
        if let Some(parent_id) = criterion.parent_id {
            storage::criterion::get(&mut tx, parent_id).await?;
        }
        if let Some(period_id) = criterion.period_id {
            storage::period::get(&mut tx, period_id).await?;
        }
        storage::criterion::insert(&mut tx, &criterion).await?;
        tx.commit().await?;

        info!(id = %criterion.id, kode = %criterion.kode, "Criterion created");
        Ok(criterion)
    }

    pub async fn get(&self, id: Uuid) -> Result<Criterion> {
        let mut conn = self.ctx.storage.acquire().await?;
        storage::criterion::get(&mut conn, id).await
    }

    /// Criteria of a period, including the ones shared by every period.
    pub async fn list(&self, period_id: Option<Uuid>) -> Result<Vec<Criterion>> {
        let mut conn = self.ctx.storage.acquire().await?;
        storage::criterion::list(&mut conn, period_id).await
    }

    pub async fn tree(&self, period_id: Option<Uuid>) -> Result<Vec<CriterionNode>> {
        Ok(build_tree(self.list(period_id).await?))
    }

    pub async fn update(&self, id: Uuid, update: CriterionUpdate) -> Result<Criterion> {
        if update.weight.is_some_and(|w| w < 0.0) {
            return Err(Error::validation("weight", "weight must not be negative"));
        }
        if update.kode.as_deref().is_some_and(|k| k.trim().is_empty()) {
            return Err(Error::validation("kode", "kode is required"));
        }

        let mut tx = self.ctx.storage.begin().await?;
        let mut criterion = storage::criterion::get(&mut tx, id).await?;
        update.apply(&mut criterion);
        storage::criterion::update(&mut tx, &criterion).await?;
        tx.commit().await?;

        info!(%id, kode = %criterion.kode, "Criterion updated");
        Ok(criterion)
    }

    /// Reparents `id` under `parent_id`, or makes it a root. A node cannot
    /// move below itself.
    pub async fn move_to(&self, id: Uuid, parent_id: Option<Uuid>) -> Result<Criterion> {
        let mut tx = self.ctx.storage.begin().await?;
        let mut criterion = storage::criterion::get(&mut tx, id).await?;

        if let Some(parent_id) = parent_id {
            if parent_id == id {
                return Err(Error::structural(format!(
                    "criterion {id} cannot be its own parent"
                )));
            }
            storage::criterion::get(&mut tx, parent_id).await?;
            let below = storage::criterion::descendant_ids(&mut tx, id).await?;
            if below.contains(&parent_id) {
                return Err(Error::structural(format!(
                    "circular reference: {parent_id} is below {id}"
                )));
            }
        }

        let from = criterion.parent_id;
        criterion.parent_id = parent_id;
        criterion.updated_at = Utc::now();
        storage::criterion::update(&mut tx, &criterion).await?;
        tx.commit().await?;

        info!(%id, from = ?from, to = ?parent_id, "Criterion moved");
        Ok(criterion)
    }

    /// Deletes a leaf criterion that no submission or data row uses. Its
    /// column mappings go with it.
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let mut tx = self.ctx.storage.begin().await?;
        storage::criterion::get(&mut tx, id).await?;

        let children = storage::criterion::child_count(&mut tx, id).await?;
        if children > 0 {
            return Err(Error::structural(format!(
                "criterion {id} has {children} sub-criteria"
            )));
        }
        let submissions = storage::submission::count_for_criterion(&mut tx, id).await?;
        if submissions > 0 {
            return Err(Error::structural(format!(
                "criterion {id} is used by {submissions} submissions"
            )));
        }
        if storage::mapping::in_use(&mut tx, id).await? {
            return Err(Error::structural(format!(
                "criterion {id} has data rows bound to its column mappings"
            )));
        }

        let mappings = storage::mapping::delete_for_criterion(&mut tx, id).await?;
        storage::criterion::delete(&mut tx, id).await?;
        tx.commit().await?;

        info!(%id, mappings, "Criterion deleted");
        Ok(())
    }
}
