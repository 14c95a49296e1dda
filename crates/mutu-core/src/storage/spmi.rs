use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use uuid::Uuid;

use super::{actor_col, actor_text, enum_col, expect_one, uuid_col};
use crate::models::{IndicatorMonitoring, SpmiIndicator, SpmiStandard, StatusCounts};
use crate::{Error, Result};

const STANDARD: &str = "SpmiStandard";
const INDICATOR: &str = "SpmiIndicator";

const STANDARD_COLUMNS: &str = "id, code, name, category, statement, status, version, \
                                approved_by, approved_at, created_by, created_at, updated_at";

pub async fn insert_standard(conn: &mut SqliteConnection, standard: &SpmiStandard) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO spmi_standards
            (id, code, name, category, statement, status, version, approved_by, approved_at,
             created_by, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(standard.id.to_string())
    .bind(&standard.code)
    .bind(&standard.name)
    .bind(&standard.category)
    .bind(&standard.statement)
    .bind(standard.status.as_str())
    .bind(standard.version)
    .bind(actor_text(standard.approved_by))
    .bind(standard.approved_at)
    .bind(actor_text(standard.created_by))
    .bind(standard.created_at)
    .bind(standard.updated_at)
    .execute(&mut *conn)
    .await
    .map_err(|e| Error::from_insert(e, "code", &standard.code))?;

    Ok(())
}

pub async fn update_standard(conn: &mut SqliteConnection, standard: &SpmiStandard) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE spmi_standards
        SET name = ?, category = ?, statement = ?, status = ?, version = ?, approved_by = ?,
            approved_at = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&standard.name)
    .bind(&standard.category)
    .bind(&standard.statement)
    .bind(standard.status.as_str())
    .bind(standard.version)
    .bind(actor_text(standard.approved_by))
    .bind(standard.approved_at)
    .bind(standard.updated_at)
    .bind(standard.id.to_string())
    .execute(&mut *conn)
    .await?;

    expect_one(&result, STANDARD, standard.id)
}

pub async fn get_standard(conn: &mut SqliteConnection, id: Uuid) -> Result<SpmiStandard> {
    let sql = format!("SELECT {STANDARD_COLUMNS} FROM spmi_standards WHERE id = ?");
    let row = sqlx::query(&sql)
        .bind(id.to_string())
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(Error::not_found(STANDARD, id))?;
    parse_standard(&row)
}

pub async fn list_standards(conn: &mut SqliteConnection) -> Result<Vec<SpmiStandard>> {
    let sql = format!("SELECT {STANDARD_COLUMNS} FROM spmi_standards ORDER BY code");
    let rows = sqlx::query(&sql).fetch_all(&mut *conn).await?;
    rows.iter().map(parse_standard).collect()
}

pub async fn delete_standard(conn: &mut SqliteConnection, id: Uuid) -> Result<()> {
    let result = sqlx::query("DELETE FROM spmi_standards WHERE id = ?")
        .bind(id.to_string())
        .execute(&mut *conn)
        .await?;
    expect_one(&result, STANDARD, id)
}

pub async fn standard_status_counts(conn: &mut SqliteConnection) -> Result<StatusCounts> {
    super::count_by_status(conn, "spmi_standards").await
}

fn parse_standard(row: &SqliteRow) -> Result<SpmiStandard> {
    Ok(SpmiStandard {
        id: uuid_col(row, "id")?,
        code: row.try_get("code")?,
        name: row.try_get("name")?,
        category: row.try_get("category")?,
        statement: row.try_get("statement")?,
        status: enum_col(row, "status")?,
        version: row.try_get("version")?,
        approved_by: actor_col(row, "approved_by")?,
        approved_at: row.try_get("approved_at")?,
        created_by: actor_col(row, "created_by")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

// Indicators

pub async fn insert_indicator(conn: &mut SqliteConnection, indicator: &SpmiIndicator) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO spmi_indicators (id, code, standard_id, name, category, target_value, unit, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(indicator.id.to_string())
    .bind(&indicator.code)
    .bind(indicator.standard_id.to_string())
    .bind(&indicator.name)
    .bind(&indicator.category)
    .bind(indicator.target_value)
    .bind(&indicator.unit)
    .bind(indicator.created_at)
    .execute(&mut *conn)
    .await
    .map_err(|e| Error::from_insert(e, "code", &indicator.code))?;

    Ok(())
}

pub async fn get_indicator(conn: &mut SqliteConnection, id: Uuid) -> Result<SpmiIndicator> {
    let row = sqlx::query(
        "SELECT id, code, standard_id, name, category, target_value, unit, created_at FROM spmi_indicators WHERE id = ?",
    )
    .bind(id.to_string())
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(Error::not_found(INDICATOR, id))?;
    parse_indicator(&row)
}

pub async fn list_indicators(
    conn: &mut SqliteConnection,
    standard_id: Uuid,
) -> Result<Vec<SpmiIndicator>> {
    let rows = sqlx::query(
        "SELECT id, code, standard_id, name, category, target_value, unit, created_at FROM spmi_indicators WHERE standard_id = ? ORDER BY code",
    )
    .bind(standard_id.to_string())
    .fetch_all(&mut *conn)
    .await?;
    rows.iter().map(parse_indicator).collect()
}

pub async fn indicator_count(conn: &mut SqliteConnection, standard_id: Uuid) -> Result<i64> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM spmi_indicators WHERE standard_id = ?")
            .bind(standard_id.to_string())
            .fetch_one(&mut *conn)
            .await?;
    Ok(count)
}

pub async fn delete_indicator(conn: &mut SqliteConnection, id: Uuid) -> Result<()> {
    let result = sqlx::query("DELETE FROM spmi_indicators WHERE id = ?")
        .bind(id.to_string())
        .execute(&mut *conn)
        .await?;
    expect_one(&result, INDICATOR, id)
}

fn parse_indicator(row: &SqliteRow) -> Result<SpmiIndicator> {
    Ok(SpmiIndicator {
        id: uuid_col(row, "id")?,
        code: row.try_get("code")?,
        standard_id: uuid_col(row, "standard_id")?,
        name: row.try_get("name")?,
        category: row.try_get("category")?,
        target_value: row.try_get("target_value")?,
        unit: row.try_get("unit")?,
        created_at: row.try_get("created_at")?,
    })
}

// Monitoring

pub async fn insert_monitoring(
    conn: &mut SqliteConnection,
    monitoring: &IndicatorMonitoring,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO indicator_monitorings
            (id, code, indicator_id, period_label, target_value, actual_value, achievement,
             attention, notes, created_by, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(monitoring.id.to_string())
    .bind(&monitoring.code)
    .bind(monitoring.indicator_id.to_string())
    .bind(&monitoring.period_label)
    .bind(monitoring.target_value)
    .bind(monitoring.actual_value)
    .bind(monitoring.achievement)
    .bind(monitoring.attention.as_str())
    .bind(&monitoring.notes)
    .bind(actor_text(monitoring.created_by))
    .bind(monitoring.created_at)
    .execute(&mut *conn)
    .await
    .map_err(|e| Error::from_insert(e, "code", &monitoring.code))?;

    Ok(())
}

pub async fn list_monitorings(
    conn: &mut SqliteConnection,
    indicator_id: Uuid,
) -> Result<Vec<IndicatorMonitoring>> {
    let rows = sqlx::query(
        r#"
        SELECT id, code, indicator_id, period_label, target_value, actual_value, achievement,
               attention, notes, created_by, created_at
        FROM indicator_monitorings WHERE indicator_id = ? ORDER BY created_at
        "#,
    )
    .bind(indicator_id.to_string())
    .fetch_all(&mut *conn)
    .await?;
    rows.iter().map(parse_monitoring).collect()
}

/// Latest monitoring of every indicator whose status needs attention.
pub async fn needing_attention(conn: &mut SqliteConnection) -> Result<Vec<IndicatorMonitoring>> {
    let rows = sqlx::query(
        r#"
        SELECT m.id, m.code, m.indicator_id, m.period_label, m.target_value, m.actual_value,
               m.achievement, m.attention, m.notes, m.created_by, m.created_at
        FROM indicator_monitorings m
        WHERE m.attention IN ('warning', 'critical')
          AND m.created_at = (
              SELECT MAX(latest.created_at) FROM indicator_monitorings latest
              WHERE latest.indicator_id = m.indicator_id
          )
        ORDER BY m.achievement
        "#,
    )
    .fetch_all(&mut *conn)
    .await?;
    rows.iter().map(parse_monitoring).collect()
}

fn parse_monitoring(row: &SqliteRow) -> Result<IndicatorMonitoring> {
    Ok(IndicatorMonitoring {
        id: uuid_col(row, "id")?,
        code: row.try_get("code")?,
        indicator_id: uuid_col(row, "indicator_id")?,
        period_label: row.try_get("period_label")?,
        target_value: row.try_get("target_value")?,
        actual_value: row.try_get("actual_value")?,
        achievement: row.try_get("achievement")?,
        attention: enum_col(row, "attention")?,
        notes: row.try_get("notes")?,
        created_by: actor_col(row, "created_by")?,
        created_at: row.try_get("created_at")?,
    })
}
