//! SQLite persistence.
//!
//! Repository functions take `&mut SqliteConnection` so that a service can
//! run every statement of one operation on a single transaction.

pub mod audit;
pub mod butir_data;
pub mod criterion;
pub mod document;
pub mod mapping;
pub mod period;
pub mod reference;
pub mod rtl;
pub mod rtm;
mod schema;
pub mod spmi;
pub mod submission;
pub mod survey;

use std::str::FromStr;

use serde::de::DeserializeOwned;
use sqlx::pool::PoolConnection;
use sqlx::sqlite::{SqlitePoolOptions, SqliteQueryResult, SqliteRow};
use sqlx::{Pool, Row, Sqlite, SqliteConnection, Transaction};
use uuid::Uuid;

use crate::models::StatusCounts;
use crate::{ActorId, Error, Result};

#[derive(Debug, Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

impl Storage {
    pub async fn open(path: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&format!("sqlite:{path}?mode=rwc"))
            .await?;

        sqlx::query(schema::INIT_SQL).execute(&pool).await?;

        Ok(Self { pool })
    }

    /// Private in-memory database on a single connection that is never
    /// recycled, so its contents live as long as the pool.
    pub async fn open_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        sqlx::query(schema::INIT_SQL).execute(&pool).await?;

        Ok(Self { pool })
    }

    pub async fn begin(&self) -> Result<Transaction<'static, Sqlite>> {
        Ok(self.pool.begin().await?)
    }

    pub async fn acquire(&self) -> Result<PoolConnection<Sqlite>> {
        Ok(self.pool.acquire().await?)
    }

    pub const fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}

// Row decoding helpers shared by the repositories.

fn bad_value(kind: &'static str, value: impl Into<String>) -> Error {
    Error::InvalidValue {
        kind,
        value: value.into(),
    }
}

pub(crate) fn uuid_col(row: &SqliteRow, column: &str) -> Result<Uuid> {
    let text: String = row.try_get(column)?;
    text.parse().map_err(|_| bad_value("uuid", text))
}

pub(crate) fn opt_uuid_col(row: &SqliteRow, column: &str) -> Result<Option<Uuid>> {
    let text: Option<String> = row.try_get(column)?;
    text.map(|t| t.parse().map_err(|_| bad_value("uuid", t)))
        .transpose()
}

pub(crate) fn actor_col(row: &SqliteRow, column: &str) -> Result<Option<ActorId>> {
    Ok(opt_uuid_col(row, column)?.map(ActorId))
}

/// Parses a string-valued enum column (statuses, categories, types).
pub(crate) fn enum_col<T: FromStr<Err = Error>>(row: &SqliteRow, column: &str) -> Result<T> {
    let text: String = row.try_get(column)?;
    text.parse()
}

pub(crate) fn json_col<T: DeserializeOwned>(row: &SqliteRow, column: &str) -> Result<T> {
    let text: String = row.try_get(column)?;
    Ok(serde_json::from_str(&text)?)
}

pub(crate) fn actor_text(actor: Option<ActorId>) -> Option<String> {
    actor.map(|a| a.to_string())
}

pub(crate) fn opt_id_text(id: Option<Uuid>) -> Option<String> {
    id.map(|i| i.to_string())
}

/// Fails with `NotFound` when a keyed update or delete touched nothing.
pub(crate) fn expect_one(result: &SqliteQueryResult, entity: &'static str, id: Uuid) -> Result<()> {
    if result.rows_affected() == 0 {
        return Err(Error::not_found(entity, id));
    }
    Ok(())
}

pub(crate) async fn count_by_status(
    conn: &mut SqliteConnection,
    table: &'static str,
) -> Result<StatusCounts> {
    let sql = format!("SELECT status, COUNT(*) FROM {table} GROUP BY status ORDER BY status");
    let rows: Vec<(String, i64)> = sqlx::query_as(&sql).fetch_all(&mut *conn).await?;
    Ok(StatusCounts(rows.into_iter().collect()))
}

pub(crate) async fn exists(
    conn: &mut SqliteConnection,
    table: &'static str,
    column: &'static str,
    id: Uuid,
) -> Result<bool> {
    let sql = format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE {column} = ?)");
    let found: bool = sqlx::query_scalar(&sql)
        .bind(id.to_string())
        .fetch_one(&mut *conn)
        .await?;
    Ok(found)
}
