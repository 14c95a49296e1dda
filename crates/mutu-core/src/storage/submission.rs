use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use uuid::Uuid;

use super::{actor_col, actor_text, enum_col, expect_one, json_col, uuid_col};
use crate::models::{CriterionSubmission, StatusCounts, SubmissionStatus};
use crate::{Error, Result};

const ENTITY: &str = "CriterionSubmission";

const COLUMNS: &str = "id, period_id, criterion_id, content, form_data, status, is_complete, \
                       completion_percentage, notes, submitted_by, submitted_at, reviewed_by, \
                       reviewed_at, approved_by, approved_at, created_by, created_at, updated_at";

pub async fn insert(conn: &mut SqliteConnection, submission: &CriterionSubmission) -> Result<()> {
    let form_data = serde_json::to_string(&submission.form_data)?;

    sqlx::query(
        r#"
        INSERT INTO criterion_submissions
            (id, period_id, criterion_id, content, form_data, status, is_complete,
             completion_percentage, notes, submitted_by, submitted_at, reviewed_by, reviewed_at,
             approved_by, approved_at, created_by, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(submission.id.to_string())
    .bind(submission.period_id.to_string())
    .bind(submission.criterion_id.to_string())
    .bind(&submission.content)
    .bind(form_data)
    .bind(submission.status.as_str())
    .bind(submission.is_complete)
    .bind(submission.completion_percentage)
    .bind(&submission.notes)
    .bind(actor_text(submission.submitted_by))
    .bind(submission.submitted_at)
    .bind(actor_text(submission.reviewed_by))
    .bind(submission.reviewed_at)
    .bind(actor_text(submission.approved_by))
    .bind(submission.approved_at)
    .bind(actor_text(submission.created_by))
    .bind(submission.created_at)
    .bind(submission.updated_at)
    .execute(&mut *conn)
    .await
    .map_err(|e| {
        Error::from_insert(
            e,
            "period_id, criterion_id",
            &format!("{}, {}", submission.period_id, submission.criterion_id),
        )
    })?;

    Ok(())
}

/// Persists content, status, and every stamp of an already loaded submission.
pub async fn update(conn: &mut SqliteConnection, submission: &CriterionSubmission) -> Result<()> {
    let form_data = serde_json::to_string(&submission.form_data)?;

    let result = sqlx::query(
        r#"
        UPDATE criterion_submissions
        SET content = ?, form_data = ?, status = ?, is_complete = ?, completion_percentage = ?,
            notes = ?, submitted_by = ?, submitted_at = ?, reviewed_by = ?, reviewed_at = ?,
            approved_by = ?, approved_at = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&submission.content)
    .bind(form_data)
    .bind(submission.status.as_str())
    .bind(submission.is_complete)
    .bind(submission.completion_percentage)
    .bind(&submission.notes)
    .bind(actor_text(submission.submitted_by))
    .bind(submission.submitted_at)
    .bind(actor_text(submission.reviewed_by))
    .bind(submission.reviewed_at)
    .bind(actor_text(submission.approved_by))
    .bind(submission.approved_at)
    .bind(submission.updated_at)
    .bind(submission.id.to_string())
    .execute(&mut *conn)
    .await?;

    expect_one(&result, ENTITY, submission.id)
}

pub async fn find(conn: &mut SqliteConnection, id: Uuid) -> Result<Option<CriterionSubmission>> {
    let sql = format!("SELECT {COLUMNS} FROM criterion_submissions WHERE id = ?");
    let row = sqlx::query(&sql)
        .bind(id.to_string())
        .fetch_optional(&mut *conn)
        .await?;
    row.as_ref().map(parse_row).transpose()
}

pub async fn get(conn: &mut SqliteConnection, id: Uuid) -> Result<CriterionSubmission> {
    find(conn, id).await?.ok_or(Error::not_found(ENTITY, id))
}

pub async fn list_for_period(
    conn: &mut SqliteConnection,
    period_id: Uuid,
    status: Option<SubmissionStatus>,
) -> Result<Vec<CriterionSubmission>> {
    let rows = match status {
        Some(status) => {
            let sql = format!(
                "SELECT {COLUMNS} FROM criterion_submissions WHERE period_id = ? AND status = ? ORDER BY created_at"
            );
            sqlx::query(&sql)
                .bind(period_id.to_string())
                .bind(status.as_str())
                .fetch_all(&mut *conn)
                .await?
        }
        None => {
            let sql = format!(
                "SELECT {COLUMNS} FROM criterion_submissions WHERE period_id = ? ORDER BY created_at"
            );
            sqlx::query(&sql)
                .bind(period_id.to_string())
                .fetch_all(&mut *conn)
                .await?
        }
    };
    rows.iter().map(parse_row).collect()
}

pub async fn count_for_period(conn: &mut SqliteConnection, period_id: Uuid) -> Result<i64> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM criterion_submissions WHERE period_id = ?")
            .bind(period_id.to_string())
            .fetch_one(&mut *conn)
            .await?;
    Ok(count)
}

pub async fn count_for_criterion(conn: &mut SqliteConnection, criterion_id: Uuid) -> Result<i64> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM criterion_submissions WHERE criterion_id = ?")
            .bind(criterion_id.to_string())
            .fetch_one(&mut *conn)
            .await?;
    Ok(count)
}

pub async fn count_by_status(conn: &mut SqliteConnection) -> Result<StatusCounts> {
    super::count_by_status(conn, "criterion_submissions").await
}

/// Mean completion of a period's submissions, 0 when there are none.
pub async fn average_completion(conn: &mut SqliteConnection, period_id: Uuid) -> Result<f64> {
    let avg: Option<f64> = sqlx::query_scalar(
        "SELECT AVG(completion_percentage) FROM criterion_submissions WHERE period_id = ?",
    )
    .bind(period_id.to_string())
    .fetch_one(&mut *conn)
    .await?;
    Ok(crate::progress::percent(avg.unwrap_or(0.0)))
}

pub async fn delete(conn: &mut SqliteConnection, id: Uuid) -> Result<()> {
    let result = sqlx::query("DELETE FROM criterion_submissions WHERE id = ?")
        .bind(id.to_string())
        .execute(&mut *conn)
        .await?;
    expect_one(&result, ENTITY, id)
}

fn parse_row(row: &SqliteRow) -> Result<CriterionSubmission> {
    Ok(CriterionSubmission {
        id: uuid_col(row, "id")?,
        period_id: uuid_col(row, "period_id")?,
        criterion_id: uuid_col(row, "criterion_id")?,
        content: row.try_get("content")?,
        form_data: json_col(row, "form_data")?,
        status: enum_col(row, "status")?,
        is_complete: row.try_get("is_complete")?,
        completion_percentage: row.try_get("completion_percentage")?,
        notes: row.try_get("notes")?,
        submitted_by: actor_col(row, "submitted_by")?,
        submitted_at: row.try_get("submitted_at")?,
        reviewed_by: actor_col(row, "reviewed_by")?,
        reviewed_at: row.try_get("reviewed_at")?,
        approved_by: actor_col(row, "approved_by")?,
        approved_at: row.try_get("approved_at")?,
        created_by: actor_col(row, "created_by")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
