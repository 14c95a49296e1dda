//! Wide-table rows. Slot values are stored as JSON text; absent and null
//! values are stored as SQL NULL.

use std::collections::BTreeMap;

use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection};
use uuid::Uuid;

use super::{expect_one, uuid_col};
use crate::form::{ColumnSlot, RawRow};
use crate::{Error, Result};

const ENTITY: &str = "ButirData";

pub(crate) const SELECT_COLUMNS: &str = "id, criterion_id, submission_id, row_number, \
    mapping_version, c1, c2, c3, c4, c5, c6, c7, c8, c9, c10, c11, c12, c13, c14, c15, c16, c17, \
    c18, c19, c20, c21, c22, c23, c24, c25, c26, c27, c28, c29, c30, created_at, updated_at";

fn slot_text(columns: &BTreeMap<ColumnSlot, serde_json::Value>, slot: ColumnSlot) -> Option<String> {
    columns
        .get(&slot)
        .filter(|v| !v.is_null())
        .map(ToString::to_string)
}

pub async fn insert(conn: &mut SqliteConnection, row: &RawRow) -> Result<()> {
    let mut qb: QueryBuilder<'_, Sqlite> = QueryBuilder::new(
        "INSERT INTO butir_data (id, criterion_id, submission_id, row_number, mapping_version, created_at, updated_at",
    );
    for slot in ColumnSlot::all() {
        qb.push(", ").push(slot.column_name());
    }
    qb.push(") VALUES (");
    let mut values = qb.separated(", ");
    values
        .push_bind(row.id.to_string())
        .push_bind(row.criterion_id.to_string())
        .push_bind(row.submission_id.to_string())
        .push_bind(row.row_number)
        .push_bind(row.mapping_version)
        .push_bind(row.created_at)
        .push_bind(row.updated_at);
    for slot in ColumnSlot::all() {
        values.push_bind(slot_text(&row.columns, slot));
    }
    values.push_unseparated(")");

    qb.build().execute(&mut *conn).await?;
    Ok(())
}

/// Rewrites every slot, the mapping version, and the row number.
pub async fn update(conn: &mut SqliteConnection, row: &RawRow) -> Result<()> {
    let mut qb: QueryBuilder<'_, Sqlite> = QueryBuilder::new("UPDATE butir_data SET ");
    let mut sets = qb.separated(", ");
    sets.push("row_number = ").push_bind_unseparated(row.row_number);
    sets.push("mapping_version = ")
        .push_bind_unseparated(row.mapping_version);
    sets.push("updated_at = ").push_bind_unseparated(Utc::now());
    for slot in ColumnSlot::all() {
        sets.push(format!("{} = ", slot.column_name()))
            .push_bind_unseparated(slot_text(&row.columns, slot));
    }
    qb.push(" WHERE id = ").push_bind(row.id.to_string());

    let result = qb.build().execute(&mut *conn).await?;
    expect_one(&result, ENTITY, row.id)
}

pub async fn get(conn: &mut SqliteConnection, id: Uuid) -> Result<RawRow> {
    let sql = format!("SELECT {SELECT_COLUMNS} FROM butir_data WHERE id = ?");
    let row = sqlx::query(&sql)
        .bind(id.to_string())
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(Error::not_found(ENTITY, id))?;
    parse_row(&row)
}

pub async fn list_for_criterion(
    conn: &mut SqliteConnection,
    criterion_id: Uuid,
) -> Result<Vec<RawRow>> {
    let sql = format!(
        "SELECT {SELECT_COLUMNS} FROM butir_data WHERE criterion_id = ? ORDER BY submission_id, row_number"
    );
    let rows = sqlx::query(&sql)
        .bind(criterion_id.to_string())
        .fetch_all(&mut *conn)
        .await?;
    rows.iter().map(parse_row).collect()
}

pub async fn delete(conn: &mut SqliteConnection, id: Uuid) -> Result<()> {
    let result = sqlx::query("DELETE FROM butir_data WHERE id = ?")
        .bind(id.to_string())
        .execute(&mut *conn)
        .await?;
    expect_one(&result, ENTITY, id)
}

pub async fn delete_for_submission(conn: &mut SqliteConnection, submission_id: Uuid) -> Result<u64> {
    let result = sqlx::query("DELETE FROM butir_data WHERE submission_id = ?")
        .bind(submission_id.to_string())
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}

pub async fn count_for_criterion(conn: &mut SqliteConnection, criterion_id: Uuid) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM butir_data WHERE criterion_id = ?")
        .bind(criterion_id.to_string())
        .fetch_one(&mut *conn)
        .await?;
    Ok(count)
}

pub async fn max_row_number(conn: &mut SqliteConnection, submission_id: Uuid) -> Result<i64> {
    let max: Option<i64> =
        sqlx::query_scalar("SELECT MAX(row_number) FROM butir_data WHERE submission_id = ?")
            .bind(submission_id.to_string())
            .fetch_one(&mut *conn)
            .await?;
    Ok(max.unwrap_or(0))
}

/// Marks a criterion's rows as written under `version` without touching
/// their values.
pub async fn retag_version(
    conn: &mut SqliteConnection,
    criterion_id: Uuid,
    version: i64,
) -> Result<u64> {
    let result = sqlx::query("UPDATE butir_data SET mapping_version = ? WHERE criterion_id = ?")
        .bind(version)
        .bind(criterion_id.to_string())
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}

pub(crate) fn parse_row(row: &SqliteRow) -> Result<RawRow> {
    let mut columns = BTreeMap::new();
    for slot in ColumnSlot::all() {
        let text: Option<String> = row.try_get(slot.column_name())?;
        if let Some(text) = text {
            columns.insert(slot, serde_json::from_str(&text)?);
        }
    }

    Ok(RawRow {
        id: uuid_col(row, "id")?,
        criterion_id: uuid_col(row, "criterion_id")?,
        submission_id: uuid_col(row, "submission_id")?,
        row_number: row.try_get("row_number")?,
        mapping_version: row.try_get("mapping_version")?,
        columns,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
