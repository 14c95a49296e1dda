use std::collections::BTreeMap;

use chrono::Utc;
use serde::Deserialize;
use serde_json::{Map, Value};
use sqlx::SqliteConnection;
use tracing::info;
use uuid::Uuid;

use super::mapping::{ColumnMappingSchema, ColumnSlot};
use super::query::{ButirDataQuery, DataRow, RawRow};
use crate::models::CriterionSubmission;
use crate::storage::{self, Storage};
use crate::{Error, Result};

/// A data row as submitted, keyed by field name.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewDataRow {
    #[serde(default)]
    pub row_number: Option<i64>,
    #[serde(flatten)]
    pub values: Map<String, Value>,
}

impl NewDataRow {
    pub fn new(values: Map<String, Value>) -> Self {
        Self {
            row_number: None,
            values,
        }
    }
}

/// Reads and writes `butir_data` rows by field name.
#[derive(Clone)]
pub struct ButirDataService {
    storage: Storage,
}

impl ButirDataService {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    pub async fn query(&self, criterion_id: Uuid) -> Result<ButirDataQuery> {
        ButirDataQuery::for_criterion(self.storage.clone(), criterion_id).await
    }

    /// All rows of a submission, by row number.
    pub async fn rows(&self, submission_id: Uuid) -> Result<Vec<DataRow>> {
        let criterion_id = {
            let mut conn = self.storage.acquire().await?;
            storage::submission::get(&mut conn, submission_id)
                .await?
                .criterion_id
        };
        self.query(criterion_id)
            .await?
            .by_pengisian(submission_id)
            .get()
            .await
    }

    pub async fn create(&self, submission_id: Uuid, row: NewDataRow) -> Result<DataRow> {
        let mut tx = self.storage.begin().await?;
        let (submission, schema) = writable(&mut tx, submission_id).await?;
        let row_number = match row.row_number {
            Some(n) => n,
            None => storage::butir_data::max_row_number(&mut tx, submission_id).await? + 1,
        };
        let created = insert_row(&mut tx, &schema, &submission, row_number, &row.values).await?;
        tx.commit().await?;
        Ok(DataRow::named(created, &schema))
    }

    /// Overwrites the given fields of a row; other fields keep their values.
    pub async fn update(&self, row_id: Uuid, values: &Map<String, Value>) -> Result<DataRow> {
        let mut tx = self.storage.begin().await?;
        let mut row = storage::butir_data::get(&mut tx, row_id).await?;
        let (_, schema) = writable(&mut tx, row.submission_id).await?;

        for (slot, value) in schema.encode(values)? {
            set_slot(&mut row.columns, slot, value);
        }
        row.mapping_version = schema.version;
        row.updated_at = Utc::now();
        storage::butir_data::update(&mut tx, &row).await?;
        tx.commit().await?;
        Ok(DataRow::named(row, &schema))
    }

    pub async fn delete(&self, row_id: Uuid) -> Result<()> {
        let mut tx = self.storage.begin().await?;
        let row = storage::butir_data::get(&mut tx, row_id).await?;
        writable(&mut tx, row.submission_id).await?;
        storage::butir_data::delete(&mut tx, row_id).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Inserts rows in order. Rows without a row number are numbered by
    /// their position, starting at 1.
    pub async fn bulk_create(
        &self,
        submission_id: Uuid,
        rows: Vec<NewDataRow>,
    ) -> Result<Vec<DataRow>> {
        let mut tx = self.storage.begin().await?;
        let (submission, schema) = writable(&mut tx, submission_id).await?;
        let created = insert_all(&mut tx, &schema, &submission, rows).await?;
        tx.commit().await?;
        Ok(created)
    }

    /// Replaces every row of a submission with `rows`.
    pub async fn sync_data(&self, submission_id: Uuid, rows: Vec<NewDataRow>) -> Result<Vec<DataRow>> {
        let mut tx = self.storage.begin().await?;
        let (submission, schema) = writable(&mut tx, submission_id).await?;
        let removed = storage::butir_data::delete_for_submission(&mut tx, submission_id).await?;
        let created = insert_all(&mut tx, &schema, &submission, rows).await?;
        tx.commit().await?;

        info!(
            %submission_id,
            removed,
            inserted = created.len(),
            "Butir data synced"
        );
        Ok(created)
    }
}

fn set_slot(columns: &mut BTreeMap<ColumnSlot, Value>, slot: ColumnSlot, value: Value) {
    if value.is_null() {
        columns.remove(&slot);
    } else {
        columns.insert(slot, value);
    }
}

/// Loads a submission whose data may change, with its criterion's schema.
async fn writable(
    conn: &mut SqliteConnection,
    submission_id: Uuid,
) -> Result<(CriterionSubmission, ColumnMappingSchema)> {
    let submission = storage::submission::get(conn, submission_id).await?;
    if !submission.status.is_editable() {
        return Err(Error::validation(
            "submission",
            format!(
                "data can only change while the submission is draft or revision, not {}",
                submission.status
            ),
        ));
    }
    let schema = storage::mapping::load_schema(conn, submission.criterion_id).await?;
    if schema.is_empty() {
        return Err(Error::validation(
            "criterion_id",
            "criterion has no column mappings",
        ));
    }
    Ok((submission, schema))
}

async fn insert_row(
    conn: &mut SqliteConnection,
    schema: &ColumnMappingSchema,
    submission: &CriterionSubmission,
    row_number: i64,
    values: &Map<String, Value>,
) -> Result<RawRow> {
    let mut columns = BTreeMap::new();
    for (slot, value) in schema.encode(values)? {
        set_slot(&mut columns, slot, value);
    }
    let now = Utc::now();
    let row = RawRow {
        id: Uuid::new_v4(),
        criterion_id: submission.criterion_id,
        submission_id: submission.id,
        row_number,
        mapping_version: schema.version,
        columns,
        created_at: now,
        updated_at: now,
    };
    storage::butir_data::insert(conn, &row).await?;
    Ok(row)
}

async fn insert_all(
    conn: &mut SqliteConnection,
    schema: &ColumnMappingSchema,
    submission: &CriterionSubmission,
    rows: Vec<NewDataRow>,
) -> Result<Vec<DataRow>> {
    let mut created = Vec::with_capacity(rows.len());
    for (index, row) in rows.into_iter().enumerate() {
        let row_number = row
            .row_number
            .unwrap_or_else(|| i64::try_from(index + 1).unwrap_or(i64::MAX));
        let raw = insert_row(conn, schema, submission, row_number, &row.values).await?;
        created.push(DataRow::named(raw, schema));
    }
    Ok(created)
}
