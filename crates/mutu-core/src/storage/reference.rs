//! Units, study programs and academic years.

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use uuid::Uuid;

use super::{expect_one, opt_id_text, opt_uuid_col, uuid_col};
use crate::models::{AcademicYear, StudyProgram, Unit};
use crate::{Error, Result};

pub async fn insert_unit(conn: &mut SqliteConnection, unit: &Unit) -> Result<()> {
    sqlx::query("INSERT INTO units (id, code, name) VALUES (?, ?, ?)")
        .bind(unit.id.to_string())
        .bind(&unit.code)
        .bind(&unit.name)
        .execute(&mut *conn)
        .await
        .map_err(|e| Error::from_insert(e, "code", &unit.code))?;
    Ok(())
}

pub async fn list_units(conn: &mut SqliteConnection) -> Result<Vec<Unit>> {
    let rows = sqlx::query("SELECT id, code, name FROM units ORDER BY code")
        .fetch_all(&mut *conn)
        .await?;
    rows.iter()
        .map(|row| {
            Ok(Unit {
                id: uuid_col(row, "id")?,
                code: row.try_get("code")?,
                name: row.try_get("name")?,
            })
        })
        .collect()
}

pub async fn delete_unit(conn: &mut SqliteConnection, id: Uuid) -> Result<()> {
    let result = sqlx::query("DELETE FROM units WHERE id = ?")
        .bind(id.to_string())
        .execute(&mut *conn)
        .await?;
    expect_one(&result, "Unit", id)
}

pub async fn insert_program(conn: &mut SqliteConnection, program: &StudyProgram) -> Result<()> {
    sqlx::query("INSERT INTO study_programs (id, code, name, unit_id) VALUES (?, ?, ?, ?)")
        .bind(program.id.to_string())
        .bind(&program.code)
        .bind(&program.name)
        .bind(opt_id_text(program.unit_id))
        .execute(&mut *conn)
        .await
        .map_err(|e| Error::from_insert(e, "code", &program.code))?;
    Ok(())
}

pub async fn list_programs(conn: &mut SqliteConnection) -> Result<Vec<StudyProgram>> {
    let rows = sqlx::query("SELECT id, code, name, unit_id FROM study_programs ORDER BY code")
        .fetch_all(&mut *conn)
        .await?;
    rows.iter()
        .map(|row| {
            Ok(StudyProgram {
                id: uuid_col(row, "id")?,
                code: row.try_get("code")?,
                name: row.try_get("name")?,
                unit_id: opt_uuid_col(row, "unit_id")?,
            })
        })
        .collect()
}

pub async fn delete_program(conn: &mut SqliteConnection, id: Uuid) -> Result<()> {
    let result = sqlx::query("DELETE FROM study_programs WHERE id = ?")
        .bind(id.to_string())
        .execute(&mut *conn)
        .await?;
    expect_one(&result, "StudyProgram", id)
}

pub async fn insert_year(conn: &mut SqliteConnection, year: &AcademicYear) -> Result<()> {
    sqlx::query("INSERT INTO academic_years (id, label, is_active) VALUES (?, ?, ?)")
        .bind(year.id.to_string())
        .bind(&year.label)
        .bind(year.is_active)
        .execute(&mut *conn)
        .await
        .map_err(|e| Error::from_insert(e, "label", &year.label))?;
    Ok(())
}

pub async fn list_years(conn: &mut SqliteConnection) -> Result<Vec<AcademicYear>> {
    let rows = sqlx::query("SELECT id, label, is_active FROM academic_years ORDER BY label DESC")
        .fetch_all(&mut *conn)
        .await?;
    rows.iter().map(parse_year).collect()
}

pub async fn active_year(conn: &mut SqliteConnection) -> Result<Option<AcademicYear>> {
    let row = sqlx::query("SELECT id, label, is_active FROM academic_years WHERE is_active = 1")
        .fetch_optional(&mut *conn)
        .await?;
    row.as_ref().map(parse_year).transpose()
}

/// Makes `id` the only active academic year.
pub async fn set_active_year(conn: &mut SqliteConnection, id: Uuid) -> Result<()> {
    sqlx::query("UPDATE academic_years SET is_active = 0 WHERE is_active = 1")
        .execute(&mut *conn)
        .await?;
    let result = sqlx::query("UPDATE academic_years SET is_active = 1 WHERE id = ?")
        .bind(id.to_string())
        .execute(&mut *conn)
        .await?;
    expect_one(&result, "AcademicYear", id)
}

fn parse_year(row: &SqliteRow) -> Result<AcademicYear> {
    Ok(AcademicYear {
        id: uuid_col(row, "id")?,
        label: row.try_get("label")?,
        is_active: row.try_get("is_active")?,
    })
}
