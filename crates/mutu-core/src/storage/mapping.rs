use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use uuid::Uuid;

use super::{enum_col, json_col, uuid_col};
use crate::form::{ColumnMapping, ColumnMappingSchema, ColumnSlot};
use crate::{Error, Result};

pub async fn insert(conn: &mut SqliteConnection, mapping: &ColumnMapping) -> Result<()> {
    let field_config = serde_json::to_string(&mapping.field_config)?;

    sqlx::query(
        r#"
        INSERT INTO butir_column_mappings
            (id, criterion_id, version, field_name, column_name, field_type, field_config, display_order, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(mapping.id.to_string())
    .bind(mapping.criterion_id.to_string())
    .bind(mapping.version)
    .bind(&mapping.field_name)
    .bind(mapping.column.column_name())
    .bind(mapping.field_type.as_str())
    .bind(field_config)
    .bind(mapping.display_order)
    .bind(mapping.created_at)
    .execute(&mut *conn)
    .await
    .map_err(|e| Error::from_insert(e, "field_name", &mapping.field_name))?;

    Ok(())
}

pub async fn delete_for_criterion(conn: &mut SqliteConnection, criterion_id: Uuid) -> Result<u64> {
    let result = sqlx::query("DELETE FROM butir_column_mappings WHERE criterion_id = ?")
        .bind(criterion_id.to_string())
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}

/// Current mapping version of a criterion, 0 when it was never bound.
pub async fn current_version(conn: &mut SqliteConnection, criterion_id: Uuid) -> Result<i64> {
    let version: Option<i64> =
        sqlx::query_scalar("SELECT version FROM criterion_mapping_versions WHERE criterion_id = ?")
            .bind(criterion_id.to_string())
            .fetch_optional(&mut *conn)
            .await?;
    Ok(version.unwrap_or(0))
}

pub async fn set_version(
    conn: &mut SqliteConnection,
    criterion_id: Uuid,
    version: i64,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO criterion_mapping_versions (criterion_id, version, updated_at)
        VALUES (?, ?, ?)
        ON CONFLICT(criterion_id) DO UPDATE SET version = excluded.version, updated_at = excluded.updated_at
        "#,
    )
    .bind(criterion_id.to_string())
    .bind(version)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn list_for_criterion(
    conn: &mut SqliteConnection,
    criterion_id: Uuid,
) -> Result<Vec<ColumnMapping>> {
    let rows = sqlx::query(
        r#"
        SELECT id, criterion_id, version, field_name, column_name, field_type, field_config, display_order, created_at
        FROM butir_column_mappings WHERE criterion_id = ?
        ORDER BY display_order
        "#,
    )
    .bind(criterion_id.to_string())
    .fetch_all(&mut *conn)
    .await?;

    rows.iter().map(parse_row).collect()
}

pub async fn load_schema(
    conn: &mut SqliteConnection,
    criterion_id: Uuid,
) -> Result<ColumnMappingSchema> {
    let version = current_version(conn, criterion_id).await?;
    let mappings = list_for_criterion(conn, criterion_id).await?;
    Ok(ColumnMappingSchema {
        criterion_id,
        version,
        mappings,
    })
}

/// Whether any criterion's mappings are in use by stored data rows.
pub async fn in_use(conn: &mut SqliteConnection, criterion_id: Uuid) -> Result<bool> {
    super::exists(conn, "butir_data", "criterion_id", criterion_id).await
}

fn parse_row(row: &SqliteRow) -> Result<ColumnMapping> {
    let column_name: String = row.try_get("column_name")?;
    let column = ColumnSlot::parse(&column_name).ok_or(Error::InvalidValue {
        kind: "column_name",
        value: column_name.clone(),
    })?;

    Ok(ColumnMapping {
        id: uuid_col(row, "id")?,
        criterion_id: uuid_col(row, "criterion_id")?,
        version: row.try_get("version")?,
        field_name: row.try_get("field_name")?,
        column,
        field_type: enum_col(row, "field_type")?,
        field_config: json_col(row, "field_config")?,
        display_order: row.try_get("display_order")?,
        created_at: row.try_get("created_at")?,
    })
}
