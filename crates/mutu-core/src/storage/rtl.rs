use chrono::NaiveDate;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use uuid::Uuid;

use super::{actor_col, actor_text, enum_col, expect_one, uuid_col};
use crate::models::{Rtl, RtlStatus, StatusCounts};
use crate::{Error, Result};

const ENTITY: &str = "RTL";

const COLUMNS: &str = "id, rtl_code, finding_id, action_plan, pic_id, target_date, status, \
                       completion_percentage, verification_status, verification_notes, \
                       verified_by, verified_at, started_at, completed_at, created_by, created_at, \
                       updated_at";

pub async fn insert(conn: &mut SqliteConnection, rtl: &Rtl) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO rtls
            (id, rtl_code, finding_id, action_plan, pic_id, target_date, status, completion_percentage,
             verification_status, verification_notes, verified_by, verified_at, started_at, completed_at,
             created_by, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(rtl.id.to_string())
    .bind(&rtl.rtl_code)
    .bind(rtl.finding_id.to_string())
    .bind(&rtl.action_plan)
    .bind(actor_text(rtl.pic_id))
    .bind(rtl.target_date)
    .bind(rtl.status.as_str())
    .bind(rtl.completion_percentage)
    .bind(rtl.verification_status.as_str())
    .bind(&rtl.verification_notes)
    .bind(actor_text(rtl.verified_by))
    .bind(rtl.verified_at)
    .bind(rtl.started_at)
    .bind(rtl.completed_at)
    .bind(actor_text(rtl.created_by))
    .bind(rtl.created_at)
    .bind(rtl.updated_at)
    .execute(&mut *conn)
    .await
    .map_err(|e| Error::from_insert(e, "rtl_code", &rtl.rtl_code))?;

    Ok(())
}

pub async fn update(conn: &mut SqliteConnection, rtl: &Rtl) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE rtls
        SET action_plan = ?, pic_id = ?, target_date = ?, status = ?, completion_percentage = ?,
            verification_status = ?, verification_notes = ?, verified_by = ?, verified_at = ?,
            started_at = ?, completed_at = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&rtl.action_plan)
    .bind(actor_text(rtl.pic_id))
    .bind(rtl.target_date)
    .bind(rtl.status.as_str())
    .bind(rtl.completion_percentage)
    .bind(rtl.verification_status.as_str())
    .bind(&rtl.verification_notes)
    .bind(actor_text(rtl.verified_by))
    .bind(rtl.verified_at)
    .bind(rtl.started_at)
    .bind(rtl.completed_at)
    .bind(rtl.updated_at)
    .bind(rtl.id.to_string())
    .execute(&mut *conn)
    .await?;

    expect_one(&result, ENTITY, rtl.id)
}

pub async fn get(conn: &mut SqliteConnection, id: Uuid) -> Result<Rtl> {
    let sql = format!("SELECT {COLUMNS} FROM rtls WHERE id = ?");
    let row = sqlx::query(&sql)
        .bind(id.to_string())
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(Error::not_found(ENTITY, id))?;
    parse_row(&row)
}

pub async fn find_for_finding(conn: &mut SqliteConnection, finding_id: Uuid) -> Result<Option<Rtl>> {
    let sql = format!("SELECT {COLUMNS} FROM rtls WHERE finding_id = ?");
    let row = sqlx::query(&sql)
        .bind(finding_id.to_string())
        .fetch_optional(&mut *conn)
        .await?;
    row.as_ref().map(parse_row).transpose()
}

pub async fn code_exists(conn: &mut SqliteConnection, code: &str) -> Result<bool> {
    let found: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM rtls WHERE rtl_code = ?)")
        .bind(code)
        .fetch_one(&mut *conn)
        .await?;
    Ok(found)
}

pub async fn list(conn: &mut SqliteConnection, status: Option<RtlStatus>) -> Result<Vec<Rtl>> {
    let rows = match status {
        Some(status) => {
            let sql = format!("SELECT {COLUMNS} FROM rtls WHERE status = ? ORDER BY rtl_code");
            sqlx::query(&sql)
                .bind(status.as_str())
                .fetch_all(&mut *conn)
                .await?
        }
        None => {
            let sql = format!("SELECT {COLUMNS} FROM rtls ORDER BY rtl_code");
            sqlx::query(&sql).fetch_all(&mut *conn).await?
        }
    };
    rows.iter().map(parse_row).collect()
}

/// Unfinished RTLs with a target date on or before `until`.
pub async fn active_due(conn: &mut SqliteConnection, until: NaiveDate) -> Result<Vec<Rtl>> {
    let sql = format!(
        "SELECT {COLUMNS} FROM rtls WHERE status != 'completed' AND target_date IS NOT NULL \
         AND target_date <= ? ORDER BY target_date"
    );
    let rows = sqlx::query(&sql)
        .bind(until)
        .fetch_all(&mut *conn)
        .await?;
    rows.iter().map(parse_row).collect()
}

pub async fn delete(conn: &mut SqliteConnection, id: Uuid) -> Result<()> {
    let result = sqlx::query("DELETE FROM rtls WHERE id = ?")
        .bind(id.to_string())
        .execute(&mut *conn)
        .await?;
    expect_one(&result, ENTITY, id)
}

pub async fn count_by_status(conn: &mut SqliteConnection) -> Result<StatusCounts> {
    super::count_by_status(conn, "rtls").await
}

pub async fn average_completion(conn: &mut SqliteConnection) -> Result<f64> {
    let avg: Option<f64> = sqlx::query_scalar("SELECT AVG(completion_percentage) FROM rtls")
        .fetch_one(&mut *conn)
        .await?;
    Ok(crate::progress::percent(avg.unwrap_or(0.0)))
}

fn parse_row(row: &SqliteRow) -> Result<Rtl> {
    Ok(Rtl {
        id: uuid_col(row, "id")?,
        rtl_code: row.try_get("rtl_code")?,
        finding_id: uuid_col(row, "finding_id")?,
        action_plan: row.try_get("action_plan")?,
        pic_id: actor_col(row, "pic_id")?,
        target_date: row.try_get("target_date")?,
        status: enum_col(row, "status")?,
        completion_percentage: row.try_get("completion_percentage")?,
        verification_status: enum_col(row, "verification_status")?,
        verification_notes: row.try_get("verification_notes")?,
        verified_by: actor_col(row, "verified_by")?,
        verified_at: row.try_get("verified_at")?,
        started_at: row.try_get("started_at")?,
        completed_at: row.try_get("completed_at")?,
        created_by: actor_col(row, "created_by")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
