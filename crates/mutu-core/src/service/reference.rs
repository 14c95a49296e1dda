use tracing::info;
use uuid::Uuid;

use super::ServiceContext;
use crate::models::{AcademicYear, NewStudyProgram, NewUnit, StudyProgram, Unit};
use crate::storage;
use crate::{Error, Result};

/// Units, study programs and academic years.
#[derive(Clone)]
pub struct ReferenceService {
    ctx: ServiceContext,
}

impl ReferenceService {
    pub const fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    pub async fn create_unit(&self, new: NewUnit) -> Result<Unit> {
        let unit = new.into_unit()?;
        let mut tx = self.ctx.storage.begin().await?;
        storage::reference::insert_unit(&mut tx, &unit).await?;
        tx.commit().await?;

        info!(id = %unit.id, code = %unit.code, "Unit created");
        Ok(unit)
    }

    pub async fn units(&self) -> Result<Vec<Unit>> {
        let mut conn = self.ctx.storage.acquire().await?;
        storage::reference::list_units(&mut conn).await
    }

    pub async fn delete_unit(&self, id: Uuid) -> Result<()> {
        let mut tx = self.ctx.storage.begin().await?;
        storage::reference::delete_unit(&mut tx, id).await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn create_program(&self, new: NewStudyProgram) -> Result<StudyProgram> {
        let program = new.into_program()?;
        let mut tx = self.ctx.storage.begin().await?;
        if let Some(unit_id) = program.unit_id {
            if !storage::exists(&mut tx, "units", "id", unit_id).await? {
                return Err(Error::not_found("Unit", unit_id));
            }
        }
        storage::reference::insert_program(&mut tx, &program).await?;
        tx.commit().await?;

        info!(id = %program.id, code = %program.code, "Study program created");
        Ok(program)
    }

    pub async fn programs(&self) -> Result<Vec<StudyProgram>> {
        let mut conn = self.ctx.storage.acquire().await?;
        storage::reference::list_programs(&mut conn).await
    }

    pub async fn delete_program(&self, id: Uuid) -> Result<()> {
        let mut tx = self.ctx.storage.begin().await?;
        storage::reference::delete_program(&mut tx, id).await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn create_year(&self, label: &str) -> Result<AcademicYear> {
        let year = AcademicYear::new(label)?;
        let mut tx = self.ctx.storage.begin().await?;
        storage::reference::insert_year(&mut tx, &year).await?;
        tx.commit().await?;

        info!(id = %year.id, label = %year.label, "Academic year created");
        Ok(year)
    }

    pub async fn years(&self) -> Result<Vec<AcademicYear>> {
        let mut conn = self.ctx.storage.acquire().await?;
        storage::reference::list_years(&mut conn).await
    }

    pub async fn active_year(&self) -> Result<Option<AcademicYear>> {
        let mut conn = self.ctx.storage.acquire().await?;
        storage::reference::active_year(&mut conn).await
    }

    /// Makes `id` the single active academic year.
    pub async fn activate_year(&self, id: Uuid) -> Result<AcademicYear> {
        let mut tx = self.ctx.storage.begin().await?;
        storage::reference::set_active_year(&mut tx, id).await?;
        let year = storage::reference::active_year(&mut tx)
            .await?
            .ok_or(Error::not_found("AcademicYear", id))?;
        tx.commit().await?;

        info!(%id, label = %year.label, "Academic year activated");
        Ok(year)
    }
}
