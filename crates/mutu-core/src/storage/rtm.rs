use chrono::NaiveDate;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use uuid::Uuid;

use super::{actor_col, actor_text, enum_col, expect_one, uuid_col};
use crate::models::{ActionItem, Rtm, RtmStatus, StatusCounts};
use crate::{Error, Result};

const RTM: &str = "RTM";
const ACTION: &str = "RTMActionItem";

const RTM_COLUMNS: &str = "id, rtm_code, title, meeting_date, agenda, status, decisions, minutes, \
                           chair_id, started_at, completed_at, created_by, created_at, updated_at";

const ACTION_COLUMNS: &str = "id, action_code, rtm_id, description, pic_id, due_date, status, \
                              completion_percentage, completed_at, created_at, updated_at";

pub async fn insert(conn: &mut SqliteConnection, rtm: &Rtm) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO rtms
            (id, rtm_code, title, meeting_date, agenda, status, decisions, minutes, chair_id,
             started_at, completed_at, created_by, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(rtm.id.to_string())
    .bind(&rtm.rtm_code)
    .bind(&rtm.title)
    .bind(rtm.meeting_date)
    .bind(&rtm.agenda)
    .bind(rtm.status.as_str())
    .bind(&rtm.decisions)
    .bind(&rtm.minutes)
    .bind(actor_text(rtm.chair_id))
    .bind(rtm.started_at)
    .bind(rtm.completed_at)
    .bind(actor_text(rtm.created_by))
    .bind(rtm.created_at)
    .bind(rtm.updated_at)
    .execute(&mut *conn)
    .await
    .map_err(|e| Error::from_insert(e, "rtm_code", &rtm.rtm_code))?;

    Ok(())
}

pub async fn update(conn: &mut SqliteConnection, rtm: &Rtm) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE rtms
        SET title = ?, meeting_date = ?, agenda = ?, status = ?, decisions = ?, minutes = ?,
            chair_id = ?, started_at = ?, completed_at = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&rtm.title)
    .bind(rtm.meeting_date)
    .bind(&rtm.agenda)
    .bind(rtm.status.as_str())
    .bind(&rtm.decisions)
    .bind(&rtm.minutes)
    .bind(actor_text(rtm.chair_id))
    .bind(rtm.started_at)
    .bind(rtm.completed_at)
    .bind(rtm.updated_at)
    .bind(rtm.id.to_string())
    .execute(&mut *conn)
    .await?;

    expect_one(&result, RTM, rtm.id)
}

pub async fn get(conn: &mut SqliteConnection, id: Uuid) -> Result<Rtm> {
    let sql = format!("SELECT {RTM_COLUMNS} FROM rtms WHERE id = ?");
    let row = sqlx::query(&sql)
        .bind(id.to_string())
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(Error::not_found(RTM, id))?;
    parse_rtm(&row)
}

pub async fn list(conn: &mut SqliteConnection, status: Option<RtmStatus>) -> Result<Vec<Rtm>> {
    let rows = match status {
        Some(status) => {
            let sql =
                format!("SELECT {RTM_COLUMNS} FROM rtms WHERE status = ? ORDER BY meeting_date DESC");
            sqlx::query(&sql)
                .bind(status.as_str())
                .fetch_all(&mut *conn)
                .await?
        }
        None => {
            let sql = format!("SELECT {RTM_COLUMNS} FROM rtms ORDER BY meeting_date DESC");
            sqlx::query(&sql).fetch_all(&mut *conn).await?
        }
    };
    rows.iter().map(parse_rtm).collect()
}

pub async fn delete(conn: &mut SqliteConnection, id: Uuid) -> Result<()> {
    let result = sqlx::query("DELETE FROM rtms WHERE id = ?")
        .bind(id.to_string())
        .execute(&mut *conn)
        .await?;
    expect_one(&result, RTM, id)
}

pub async fn count_by_status(conn: &mut SqliteConnection) -> Result<StatusCounts> {
    super::count_by_status(conn, "rtms").await
}

fn parse_rtm(row: &SqliteRow) -> Result<Rtm> {
    Ok(Rtm {
        id: uuid_col(row, "id")?,
        rtm_code: row.try_get("rtm_code")?,
        title: row.try_get("title")?,
        meeting_date: row.try_get("meeting_date")?,
        agenda: row.try_get("agenda")?,
        status: enum_col(row, "status")?,
        decisions: row.try_get("decisions")?,
        minutes: row.try_get("minutes")?,
        chair_id: actor_col(row, "chair_id")?,
        started_at: row.try_get("started_at")?,
        completed_at: row.try_get("completed_at")?,
        created_by: actor_col(row, "created_by")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

// Action items

pub async fn insert_action(conn: &mut SqliteConnection, item: &ActionItem) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO rtm_action_items
            (id, action_code, rtm_id, description, pic_id, due_date, status, completion_percentage,
             completed_at, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(item.id.to_string())
    .bind(&item.action_code)
    .bind(item.rtm_id.to_string())
    .bind(&item.description)
    .bind(actor_text(item.pic_id))
    .bind(item.due_date)
    .bind(item.status.as_str())
    .bind(item.completion_percentage)
    .bind(item.completed_at)
    .bind(item.created_at)
    .bind(item.updated_at)
    .execute(&mut *conn)
    .await
    .map_err(|e| Error::from_insert(e, "action_code", &item.action_code))?;

    Ok(())
}

pub async fn update_action(conn: &mut SqliteConnection, item: &ActionItem) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE rtm_action_items
        SET description = ?, pic_id = ?, due_date = ?, status = ?, completion_percentage = ?,
            completed_at = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&item.description)
    .bind(actor_text(item.pic_id))
    .bind(item.due_date)
    .bind(item.status.as_str())
    .bind(item.completion_percentage)
    .bind(item.completed_at)
    .bind(item.updated_at)
    .bind(item.id.to_string())
    .execute(&mut *conn)
    .await?;

    expect_one(&result, ACTION, item.id)
}

pub async fn get_action(conn: &mut SqliteConnection, id: Uuid) -> Result<ActionItem> {
    let sql = format!("SELECT {ACTION_COLUMNS} FROM rtm_action_items WHERE id = ?");
    let row = sqlx::query(&sql)
        .bind(id.to_string())
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(Error::not_found(ACTION, id))?;
    parse_action(&row)
}

pub async fn list_actions(conn: &mut SqliteConnection, rtm_id: Uuid) -> Result<Vec<ActionItem>> {
    let sql = format!(
        "SELECT {ACTION_COLUMNS} FROM rtm_action_items WHERE rtm_id = ? ORDER BY action_code"
    );
    let rows = sqlx::query(&sql)
        .bind(rtm_id.to_string())
        .fetch_all(&mut *conn)
        .await?;
    rows.iter().map(parse_action).collect()
}

pub async fn action_count(conn: &mut SqliteConnection, rtm_id: Uuid) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM rtm_action_items WHERE rtm_id = ?")
        .bind(rtm_id.to_string())
        .fetch_one(&mut *conn)
        .await?;
    Ok(count)
}

/// Open action items with a due date on or before `until`.
pub async fn open_actions_due(conn: &mut SqliteConnection, until: NaiveDate) -> Result<Vec<ActionItem>> {
    let sql = format!(
        "SELECT {ACTION_COLUMNS} FROM rtm_action_items \
         WHERE status IN ('not_started', 'in_progress') AND due_date IS NOT NULL AND due_date <= ? \
         ORDER BY due_date"
    );
    let rows = sqlx::query(&sql)
        .bind(until)
        .fetch_all(&mut *conn)
        .await?;
    rows.iter().map(parse_action).collect()
}

pub async fn delete_action(conn: &mut SqliteConnection, id: Uuid) -> Result<()> {
    let result = sqlx::query("DELETE FROM rtm_action_items WHERE id = ?")
        .bind(id.to_string())
        .execute(&mut *conn)
        .await?;
    expect_one(&result, ACTION, id)
}

pub async fn action_status_counts(conn: &mut SqliteConnection) -> Result<StatusCounts> {
    super::count_by_status(conn, "rtm_action_items").await
}

pub async fn average_action_completion(conn: &mut SqliteConnection, rtm_id: Uuid) -> Result<f64> {
    let avg: Option<f64> = sqlx::query_scalar(
        "SELECT AVG(completion_percentage) FROM rtm_action_items WHERE rtm_id = ? AND status != 'cancelled'",
    )
    .bind(rtm_id.to_string())
    .fetch_one(&mut *conn)
    .await?;
    Ok(crate::progress::percent(avg.unwrap_or(0.0)))
}

fn parse_action(row: &SqliteRow) -> Result<ActionItem> {
    Ok(ActionItem {
        id: uuid_col(row, "id")?,
        action_code: row.try_get("action_code")?,
        rtm_id: uuid_col(row, "rtm_id")?,
        description: row.try_get("description")?,
        pic_id: actor_col(row, "pic_id")?,
        due_date: row.try_get("due_date")?,
        status: enum_col(row, "status")?,
        completion_percentage: row.try_get("completion_percentage")?,
        completed_at: row.try_get("completed_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
