use chrono::NaiveDate;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use uuid::Uuid;

use super::{actor_col, actor_text, enum_col, expect_one, opt_id_text, opt_uuid_col, uuid_col};
use crate::models::{
    AuditFinding, AuditPlan, AuditSchedule, FindingStatus, StatusCounts,
};
use crate::{Error, Result};

const PLAN: &str = "AuditPlan";
const SCHEDULE: &str = "AuditSchedule";
const FINDING: &str = "AuditFinding";

// Plans

pub async fn insert_plan(conn: &mut SqliteConnection, plan: &AuditPlan) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO audit_plans
            (id, name, year, scope, status, approved_by, approved_at, completed_at, created_by, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(plan.id.to_string())
    .bind(&plan.name)
    .bind(plan.year)
    .bind(&plan.scope)
    .bind(plan.status.as_str())
    .bind(actor_text(plan.approved_by))
    .bind(plan.approved_at)
    .bind(plan.completed_at)
    .bind(actor_text(plan.created_by))
    .bind(plan.created_at)
    .bind(plan.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn update_plan(conn: &mut SqliteConnection, plan: &AuditPlan) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE audit_plans
        SET name = ?, scope = ?, status = ?, approved_by = ?, approved_at = ?, completed_at = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&plan.name)
    .bind(&plan.scope)
    .bind(plan.status.as_str())
    .bind(actor_text(plan.approved_by))
    .bind(plan.approved_at)
    .bind(plan.completed_at)
    .bind(plan.updated_at)
    .bind(plan.id.to_string())
    .execute(&mut *conn)
    .await?;

    expect_one(&result, PLAN, plan.id)
}

pub async fn get_plan(conn: &mut SqliteConnection, id: Uuid) -> Result<AuditPlan> {
    let row = sqlx::query(
        r#"
        SELECT id, name, year, scope, status, approved_by, approved_at, completed_at, created_by, created_at, updated_at
        FROM audit_plans WHERE id = ?
        "#,
    )
    .bind(id.to_string())
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(Error::not_found(PLAN, id))?;

    parse_plan(&row)
}

pub async fn list_plans(conn: &mut SqliteConnection) -> Result<Vec<AuditPlan>> {
    let rows = sqlx::query(
        r#"
        SELECT id, name, year, scope, status, approved_by, approved_at, completed_at, created_by, created_at, updated_at
        FROM audit_plans ORDER BY year DESC, name
        "#,
    )
    .fetch_all(&mut *conn)
    .await?;

    rows.iter().map(parse_plan).collect()
}

pub async fn plan_status_counts(conn: &mut SqliteConnection) -> Result<StatusCounts> {
    super::count_by_status(conn, "audit_plans").await
}

fn parse_plan(row: &SqliteRow) -> Result<AuditPlan> {
    Ok(AuditPlan {
        id: uuid_col(row, "id")?,
        name: row.try_get("name")?,
        year: row.try_get("year")?,
        scope: row.try_get("scope")?,
        status: enum_col(row, "status")?,
        approved_by: actor_col(row, "approved_by")?,
        approved_at: row.try_get("approved_at")?,
        completed_at: row.try_get("completed_at")?,
        created_by: actor_col(row, "created_by")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

// Schedules

pub async fn insert_schedule(conn: &mut SqliteConnection, schedule: &AuditSchedule) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO audit_schedules (id, plan_id, unit, scheduled_date, auditor_id, status, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(schedule.id.to_string())
    .bind(schedule.plan_id.to_string())
    .bind(&schedule.unit)
    .bind(schedule.scheduled_date)
    .bind(actor_text(schedule.auditor_id))
    .bind(schedule.status.as_str())
    .bind(schedule.created_at)
    .bind(schedule.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn update_schedule(conn: &mut SqliteConnection, schedule: &AuditSchedule) -> Result<()> {
    let result = sqlx::query(
        "UPDATE audit_schedules SET status = ?, scheduled_date = ?, auditor_id = ?, updated_at = ? WHERE id = ?",
    )
    .bind(schedule.status.as_str())
    .bind(schedule.scheduled_date)
    .bind(actor_text(schedule.auditor_id))
    .bind(schedule.updated_at)
    .bind(schedule.id.to_string())
    .execute(&mut *conn)
    .await?;

    expect_one(&result, SCHEDULE, schedule.id)
}

pub async fn get_schedule(conn: &mut SqliteConnection, id: Uuid) -> Result<AuditSchedule> {
    let row = sqlx::query(
        r#"
        SELECT id, plan_id, unit, scheduled_date, auditor_id, status, created_at, updated_at
        FROM audit_schedules WHERE id = ?
        "#,
    )
    .bind(id.to_string())
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(Error::not_found(SCHEDULE, id))?;

    parse_schedule(&row)
}

pub async fn list_schedules(conn: &mut SqliteConnection, plan_id: Uuid) -> Result<Vec<AuditSchedule>> {
    let rows = sqlx::query(
        r#"
        SELECT id, plan_id, unit, scheduled_date, auditor_id, status, created_at, updated_at
        FROM audit_schedules WHERE plan_id = ? ORDER BY scheduled_date
        "#,
    )
    .bind(plan_id.to_string())
    .fetch_all(&mut *conn)
    .await?;

    rows.iter().map(parse_schedule).collect()
}

fn parse_schedule(row: &SqliteRow) -> Result<AuditSchedule> {
    Ok(AuditSchedule {
        id: uuid_col(row, "id")?,
        plan_id: uuid_col(row, "plan_id")?,
        unit: row.try_get("unit")?,
        scheduled_date: row.try_get("scheduled_date")?,
        auditor_id: actor_col(row, "auditor_id")?,
        status: enum_col(row, "status")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

// Findings

const FINDING_COLUMNS: &str = "id, finding_code, audit_plan_id, unit, category, description, \
                               status, due_date, resolution_notes, resolved_at, verified_by, \
                               verified_at, closed_by, closed_at, created_by, created_at, updated_at";

pub async fn insert_finding(conn: &mut SqliteConnection, finding: &AuditFinding) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO audit_findings
            (id, finding_code, audit_plan_id, unit, category, description, status, due_date,
             resolution_notes, resolved_at, verified_by, verified_at, closed_by, closed_at,
             created_by, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(finding.id.to_string())
    .bind(&finding.finding_code)
    .bind(opt_id_text(finding.audit_plan_id))
    .bind(&finding.unit)
    .bind(finding.category.as_str())
    .bind(&finding.description)
    .bind(finding.status.as_str())
    .bind(finding.due_date)
    .bind(&finding.resolution_notes)
    .bind(finding.resolved_at)
    .bind(actor_text(finding.verified_by))
    .bind(finding.verified_at)
    .bind(actor_text(finding.closed_by))
    .bind(finding.closed_at)
    .bind(actor_text(finding.created_by))
    .bind(finding.created_at)
    .bind(finding.updated_at)
    .execute(&mut *conn)
    .await
    .map_err(|e| Error::from_insert(e, "finding_code", &finding.finding_code))?;

    Ok(())
}

pub async fn update_finding(conn: &mut SqliteConnection, finding: &AuditFinding) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE audit_findings
        SET unit = ?, description = ?, status = ?, due_date = ?, resolution_notes = ?, resolved_at = ?,
            verified_by = ?, verified_at = ?, closed_by = ?, closed_at = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&finding.unit)
    .bind(&finding.description)
    .bind(finding.status.as_str())
    .bind(finding.due_date)
    .bind(&finding.resolution_notes)
    .bind(finding.resolved_at)
    .bind(actor_text(finding.verified_by))
    .bind(finding.verified_at)
    .bind(actor_text(finding.closed_by))
    .bind(finding.closed_at)
    .bind(finding.updated_at)
    .bind(finding.id.to_string())
    .execute(&mut *conn)
    .await?;

    expect_one(&result, FINDING, finding.id)
}

pub async fn get_finding(conn: &mut SqliteConnection, id: Uuid) -> Result<AuditFinding> {
    let sql = format!("SELECT {FINDING_COLUMNS} FROM audit_findings WHERE id = ?");
    let row = sqlx::query(&sql)
        .bind(id.to_string())
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(Error::not_found(FINDING, id))?;

    parse_finding(&row)
}

pub async fn list_findings(
    conn: &mut SqliteConnection,
    status: Option<FindingStatus>,
) -> Result<Vec<AuditFinding>> {
    let rows = match status {
        Some(status) => {
            let sql = format!(
                "SELECT {FINDING_COLUMNS} FROM audit_findings WHERE status = ? ORDER BY finding_code"
            );
            sqlx::query(&sql)
                .bind(status.as_str())
                .fetch_all(&mut *conn)
                .await?
        }
        None => {
            let sql = format!("SELECT {FINDING_COLUMNS} FROM audit_findings ORDER BY finding_code");
            sqlx::query(&sql).fetch_all(&mut *conn).await?
        }
    };
    rows.iter().map(parse_finding).collect()
}

/// Findings not yet resolved whose due date falls on or before `until`.
pub async fn open_findings_due(
    conn: &mut SqliteConnection,
    until: NaiveDate,
) -> Result<Vec<AuditFinding>> {
    let sql = format!(
        "SELECT {FINDING_COLUMNS} FROM audit_findings \
         WHERE status IN ('open', 'in_progress') AND due_date <= ? ORDER BY due_date"
    );
    let rows = sqlx::query(&sql)
        .bind(until)
        .fetch_all(&mut *conn)
        .await?;
    rows.iter().map(parse_finding).collect()
}

pub async fn delete_finding(conn: &mut SqliteConnection, id: Uuid) -> Result<()> {
    let result = sqlx::query("DELETE FROM audit_findings WHERE id = ?")
        .bind(id.to_string())
        .execute(&mut *conn)
        .await?;
    expect_one(&result, FINDING, id)
}

pub async fn finding_status_counts(conn: &mut SqliteConnection) -> Result<StatusCounts> {
    super::count_by_status(conn, "audit_findings").await
}

fn parse_finding(row: &SqliteRow) -> Result<AuditFinding> {
    Ok(AuditFinding {
        id: uuid_col(row, "id")?,
        finding_code: row.try_get("finding_code")?,
        audit_plan_id: opt_uuid_col(row, "audit_plan_id")?,
        unit: row.try_get("unit")?,
        category: enum_col(row, "category")?,
        description: row.try_get("description")?,
        status: enum_col(row, "status")?,
        due_date: row.try_get("due_date")?,
        resolution_notes: row.try_get("resolution_notes")?,
        resolved_at: row.try_get("resolved_at")?,
        verified_by: actor_col(row, "verified_by")?,
        verified_at: row.try_get("verified_at")?,
        closed_by: actor_col(row, "closed_by")?,
        closed_at: row.try_get("closed_at")?,
        created_by: actor_col(row, "created_by")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
