use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use uuid::Uuid;

use super::{actor_col, actor_text, expect_one, uuid_col};
use crate::models::Document;
use crate::{Error, Result};

const ENTITY: &str = "Document";

const COLUMNS: &str = "id, submission_id, original_name, mime_type, size, path, uploaded_by, created_at";

pub async fn insert(conn: &mut SqliteConnection, doc: &Document) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO documents (id, submission_id, original_name, mime_type, size, path, uploaded_by, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(doc.id.to_string())
    .bind(doc.submission_id.to_string())
    .bind(&doc.original_name)
    .bind(&doc.mime_type)
    .bind(doc.size)
    .bind(&doc.path)
    .bind(actor_text(doc.uploaded_by))
    .bind(doc.created_at)
    .execute(&mut *conn)
    .await
    .map_err(|e| Error::from_insert(e, "path", &doc.path))?;

    Ok(())
}

pub async fn get(conn: &mut SqliteConnection, id: Uuid) -> Result<Document> {
    let sql = format!("SELECT {COLUMNS} FROM documents WHERE id = ?");
    let row = sqlx::query(&sql)
        .bind(id.to_string())
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(Error::not_found(ENTITY, id))?;
    parse_row(&row)
}

pub async fn list_for_submission(
    conn: &mut SqliteConnection,
    submission_id: Uuid,
) -> Result<Vec<Document>> {
    let sql = format!("SELECT {COLUMNS} FROM documents WHERE submission_id = ? ORDER BY created_at");
    let rows = sqlx::query(&sql)
        .bind(submission_id.to_string())
        .fetch_all(&mut *conn)
        .await?;
    rows.iter().map(parse_row).collect()
}

pub async fn delete(conn: &mut SqliteConnection, id: Uuid) -> Result<()> {
    let result = sqlx::query("DELETE FROM documents WHERE id = ?")
        .bind(id.to_string())
        .execute(&mut *conn)
        .await?;
    expect_one(&result, ENTITY, id)
}

fn parse_row(row: &SqliteRow) -> Result<Document> {
    Ok(Document {
        id: uuid_col(row, "id")?,
        submission_id: uuid_col(row, "submission_id")?,
        original_name: row.try_get("original_name")?,
        mime_type: row.try_get("mime_type")?,
        size: row.try_get("size")?,
        path: row.try_get("path")?,
        uploaded_by: actor_col(row, "uploaded_by")?,
        created_at: row.try_get("created_at")?,
    })
}
