use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use uuid::Uuid;

use super::{json_col, opt_id_text, opt_uuid_col, uuid_col};
use crate::models::Criterion;
use crate::{Error, Result};

const ENTITY: &str = "Criterion";

const COLUMNS: &str = "id, kode, name, description, parent_id, period_id, weight, display_order, \
                       metadata, created_at, updated_at";

pub async fn insert(conn: &mut SqliteConnection, criterion: &Criterion) -> Result<()> {
    let metadata = serde_json::to_string(&criterion.metadata)?;

    sqlx::query(
        r#"
        INSERT INTO criteria
            (id, kode, name, description, parent_id, period_id, weight, display_order, metadata, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(criterion.id.to_string())
    .bind(&criterion.kode)
    .bind(&criterion.name)
    .bind(&criterion.description)
    .bind(opt_id_text(criterion.parent_id))
    .bind(opt_id_text(criterion.period_id))
    .bind(criterion.weight)
    .bind(criterion.display_order)
    .bind(metadata)
    .bind(criterion.created_at)
    .bind(criterion.updated_at)
    .execute(&mut *conn)
    .await
    .map_err(|e| Error::from_insert(e, "kode", &criterion.kode))?;

    Ok(())
}

/// Writes every mutable column, including `parent_id`.
pub async fn update(conn: &mut SqliteConnection, criterion: &Criterion) -> Result<()> {
    let metadata = serde_json::to_string(&criterion.metadata)?;

    let result = sqlx::query(
        r#"
        UPDATE criteria
        SET kode = ?, name = ?, description = ?, parent_id = ?, weight = ?, display_order = ?,
            metadata = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&criterion.kode)
    .bind(&criterion.name)
    .bind(&criterion.description)
    .bind(opt_id_text(criterion.parent_id))
    .bind(criterion.weight)
    .bind(criterion.display_order)
    .bind(metadata)
    .bind(criterion.updated_at)
    .bind(criterion.id.to_string())
    .execute(&mut *conn)
    .await
    .map_err(|e| Error::from_insert(e, "kode", &criterion.kode))?;

    super::expect_one(&result, ENTITY, criterion.id)
}

pub async fn find(conn: &mut SqliteConnection, id: Uuid) -> Result<Option<Criterion>> {
    let sql = format!("SELECT {COLUMNS} FROM criteria WHERE id = ?");
    let row = sqlx::query(&sql)
        .bind(id.to_string())
        .fetch_optional(&mut *conn)
        .await?;
    row.as_ref().map(parse_row).transpose()
}

pub async fn get(conn: &mut SqliteConnection, id: Uuid) -> Result<Criterion> {
    find(conn, id).await?.ok_or(Error::not_found(ENTITY, id))
}

/// Criteria of a period (plus unscoped ones), or all criteria.
pub async fn list(conn: &mut SqliteConnection, period_id: Option<Uuid>) -> Result<Vec<Criterion>> {
    let rows = match period_id {
        Some(period_id) => {
            let sql = format!(
                "SELECT {COLUMNS} FROM criteria WHERE period_id = ? OR period_id IS NULL ORDER BY display_order, kode"
            );
            sqlx::query(&sql)
                .bind(period_id.to_string())
                .fetch_all(&mut *conn)
                .await?
        }
        None => {
            let sql = format!("SELECT {COLUMNS} FROM criteria ORDER BY display_order, kode");
            sqlx::query(&sql).fetch_all(&mut *conn).await?
        }
    };
    rows.iter().map(parse_row).collect()
}

pub async fn child_count(conn: &mut SqliteConnection, id: Uuid) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM criteria WHERE parent_id = ?")
        .bind(id.to_string())
        .fetch_one(&mut *conn)
        .await?;
    Ok(count)
}

/// Ids of every node below `id`.
pub async fn descendant_ids(conn: &mut SqliteConnection, id: Uuid) -> Result<Vec<Uuid>> {
    let ids: Vec<String> = sqlx::query_scalar(
        r#"
        WITH RECURSIVE below(id) AS (
            SELECT id FROM criteria WHERE parent_id = ?
            UNION
            SELECT c.id FROM criteria c JOIN below b ON c.parent_id = b.id
        )
        SELECT id FROM below
        "#,
    )
    .bind(id.to_string())
    .fetch_all(&mut *conn)
    .await?;

    ids.into_iter()
        .map(|s| {
            s.parse().map_err(|_| Error::InvalidValue {
                kind: "uuid",
                value: s,
            })
        })
        .collect()
}

pub async fn delete(conn: &mut SqliteConnection, id: Uuid) -> Result<()> {
    let result = sqlx::query("DELETE FROM criteria WHERE id = ?")
        .bind(id.to_string())
        .execute(&mut *conn)
        .await?;
    super::expect_one(&result, ENTITY, id)
}

fn parse_row(row: &SqliteRow) -> Result<Criterion> {
    Ok(Criterion {
        id: uuid_col(row, "id")?,
        kode: row.try_get("kode")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        parent_id: opt_uuid_col(row, "parent_id")?,
        period_id: opt_uuid_col(row, "period_id")?,
        weight: row.try_get("weight")?,
        display_order: row.try_get("display_order")?,
        metadata: json_col(row, "metadata")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
