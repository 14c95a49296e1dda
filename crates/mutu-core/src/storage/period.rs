use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use uuid::Uuid;

use super::{actor_col, actor_text, enum_col, expect_one, uuid_col};
use crate::models::{AccreditationPeriod, PeriodStatus, StatusCounts};
use crate::{Error, Result};

const ENTITY: &str = "AccreditationPeriod";

const COLUMNS: &str =
    "id, name, program, start_date, end_date, status, created_by, created_at, updated_at";

pub async fn insert(conn: &mut SqliteConnection, period: &AccreditationPeriod) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO accreditation_periods
            (id, name, program, start_date, end_date, status, created_by, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(period.id.to_string())
    .bind(&period.name)
    .bind(&period.program)
    .bind(period.start_date)
    .bind(period.end_date)
    .bind(period.status.as_str())
    .bind(actor_text(period.created_by))
    .bind(period.created_at)
    .bind(period.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn find(conn: &mut SqliteConnection, id: Uuid) -> Result<Option<AccreditationPeriod>> {
    let sql = format!("SELECT {COLUMNS} FROM accreditation_periods WHERE id = ?");
    let row = sqlx::query(&sql)
        .bind(id.to_string())
        .fetch_optional(&mut *conn)
        .await?;
    row.as_ref().map(parse_row).transpose()
}

pub async fn get(conn: &mut SqliteConnection, id: Uuid) -> Result<AccreditationPeriod> {
    find(conn, id).await?.ok_or(Error::not_found(ENTITY, id))
}

pub async fn list(
    conn: &mut SqliteConnection,
    status: Option<PeriodStatus>,
) -> Result<Vec<AccreditationPeriod>> {
    let rows = match status {
        Some(status) => {
            let sql = format!(
                "SELECT {COLUMNS} FROM accreditation_periods WHERE status = ? ORDER BY start_date DESC"
            );
            sqlx::query(&sql)
                .bind(status.as_str())
                .fetch_all(&mut *conn)
                .await?
        }
        None => {
            let sql = format!("SELECT {COLUMNS} FROM accreditation_periods ORDER BY start_date DESC");
            sqlx::query(&sql).fetch_all(&mut *conn).await?
        }
    };
    rows.iter().map(parse_row).collect()
}

pub async fn update_status(
    conn: &mut SqliteConnection,
    id: Uuid,
    status: PeriodStatus,
) -> Result<()> {
    let result =
        sqlx::query("UPDATE accreditation_periods SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(Utc::now())
            .bind(id.to_string())
            .execute(&mut *conn)
            .await?;
    expect_one(&result, ENTITY, id)
}

pub async fn delete(conn: &mut SqliteConnection, id: Uuid) -> Result<()> {
    let result = sqlx::query("DELETE FROM accreditation_periods WHERE id = ?")
        .bind(id.to_string())
        .execute(&mut *conn)
        .await?;
    expect_one(&result, ENTITY, id)
}

pub async fn count_by_status(conn: &mut SqliteConnection) -> Result<StatusCounts> {
    super::count_by_status(conn, "accreditation_periods").await
}

fn parse_row(row: &SqliteRow) -> Result<AccreditationPeriod> {
    Ok(AccreditationPeriod {
        id: uuid_col(row, "id")?,
        name: row.try_get("name")?,
        program: row.try_get("program")?,
        start_date: row.try_get("start_date")?,
        end_date: row.try_get("end_date")?,
        status: enum_col(row, "status")?,
        created_by: actor_col(row, "created_by")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
