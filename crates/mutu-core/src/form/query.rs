//! Named-field queries over `butir_data`.
//!
//! Field names are resolved to their slots when the predicate is added, so
//! an unknown name fails early with `FieldNotMapped`. Stored values are JSON
//! text and compared through `json_extract(cN, '$')`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use sqlx::{QueryBuilder, Sqlite};
use tracing::debug;
use uuid::Uuid;

use super::mapping::{ColumnMappingSchema, ColumnSlot};
use crate::storage::{butir_data, Storage};
use crate::Result;

string_enum! {
    pub enum Comparison {
        Equal => "=",
        NotEqual => "!=",
        Less => "<",
        LessOrEqual => "<=",
        Greater => ">",
        GreaterOrEqual => ">=",
        Like => "like",
    }
}

string_enum! {
    pub enum Direction {
        Asc => "asc",
        Desc => "desc",
    }
}

/// A stored data row with its values keyed by slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawRow {
    pub id: Uuid,
    pub criterion_id: Uuid,
    pub submission_id: Uuid,
    pub row_number: i64,
    pub mapping_version: i64,
    pub columns: BTreeMap<ColumnSlot, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A data row as returned to callers. `values` are keyed by field name, or
/// by column name for raw-column queries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataRow {
    pub id: Uuid,
    pub submission_id: Uuid,
    pub row_number: i64,
    pub mapping_version: i64,
    pub values: Map<String, Value>,
}

impl DataRow {
    pub fn named(row: RawRow, schema: &ColumnMappingSchema) -> Self {
        Self {
            values: schema.decode(&row.columns),
            id: row.id,
            submission_id: row.submission_id,
            row_number: row.row_number,
            mapping_version: row.mapping_version,
        }
    }

    pub fn raw(row: RawRow) -> Self {
        Self {
            values: row
                .columns
                .into_iter()
                .map(|(slot, value)| (slot.column_name().to_string(), value))
                .collect(),
            id: row.id,
            submission_id: row.submission_id,
            row_number: row.row_number,
            mapping_version: row.mapping_version,
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub last_page: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64, page: i64, per_page: i64) -> Self {
        let last_page = if per_page > 0 {
            ((total + per_page - 1) / per_page).max(1)
        } else {
            1
        };
        Self {
            items,
            total,
            page,
            per_page,
            last_page,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Connective {
    And,
    Or,
}

#[derive(Debug, Clone)]
enum Predicate {
    Compare(ColumnSlot, Comparison, Value),
    In(ColumnSlot, Vec<Value>),
    Null(ColumnSlot),
}

#[derive(Debug, Clone)]
struct Filter {
    connective: Connective,
    predicate: Predicate,
}

/// Query session for one criterion, holding its loaded mapping schema.
#[derive(Debug, Clone)]
pub struct ButirDataQuery {
    storage: Storage,
    schema: ColumnMappingSchema,
    submission_id: Option<Uuid>,
    filters: Vec<Filter>,
    orders: Vec<(ColumnSlot, Direction)>,
    raw: bool,
}

impl ButirDataQuery {
    pub async fn for_criterion(storage: Storage, criterion_id: Uuid) -> Result<Self> {
        let schema = {
            let mut conn = storage.acquire().await?;
            crate::storage::mapping::load_schema(&mut conn, criterion_id).await?
        };
        Ok(Self::with_schema(storage, schema))
    }

    pub fn with_schema(storage: Storage, schema: ColumnMappingSchema) -> Self {
        Self {
            storage,
            schema,
            submission_id: None,
            filters: Vec::new(),
            orders: Vec::new(),
            raw: false,
        }
    }

    pub const fn schema(&self) -> &ColumnMappingSchema {
        &self.schema
    }

    fn push(mut self, connective: Connective, predicate: Predicate) -> Self {
        self.filters.push(Filter {
            connective,
            predicate,
        });
        self
    }

    pub fn where_field(
        self,
        field: &str,
        comparison: Comparison,
        value: impl Into<Value>,
    ) -> Result<Self> {
        let slot = self.schema.column_for(field)?;
        Ok(self.push(Connective::And, Predicate::Compare(slot, comparison, value.into())))
    }

    pub fn or_where_field(
        self,
        field: &str,
        comparison: Comparison,
        value: impl Into<Value>,
    ) -> Result<Self> {
        let slot = self.schema.column_for(field)?;
        Ok(self.push(Connective::Or, Predicate::Compare(slot, comparison, value.into())))
    }

    pub fn where_field_in(self, field: &str, values: Vec<Value>) -> Result<Self> {
        let slot = self.schema.column_for(field)?;
        Ok(self.push(Connective::And, Predicate::In(slot, values)))
    }

    pub fn where_field_null(self, field: &str) -> Result<Self> {
        let slot = self.schema.column_for(field)?;
        Ok(self.push(Connective::And, Predicate::Null(slot)))
    }

    pub fn order_by_field(mut self, field: &str, direction: Direction) -> Result<Self> {
        let slot = self.schema.column_for(field)?;
        self.orders.push((slot, direction));
        Ok(self)
    }

    /// Restricts to the rows of one submission.
    #[must_use]
    pub fn by_pengisian(mut self, submission_id: Uuid) -> Self {
        self.submission_id = Some(submission_id);
        self
    }

    /// Returns rows keyed by column name instead of field name.
    #[must_use]
    pub fn as_raw_columns(mut self) -> Self {
        self.raw = true;
        self
    }

    fn push_where(&self, qb: &mut QueryBuilder<'_, Sqlite>) {
        qb.push(" WHERE criterion_id = ")
            .push_bind(self.schema.criterion_id.to_string());
        if let Some(submission_id) = self.submission_id {
            qb.push(" AND submission_id = ")
                .push_bind(submission_id.to_string());
        }
        if self.filters.is_empty() {
            return;
        }
        qb.push(" AND (");
        for (index, filter) in self.filters.iter().enumerate() {
            if index > 0 {
                qb.push(match filter.connective {
                    Connective::And => " AND ",
                    Connective::Or => " OR ",
                });
            }
            push_predicate(qb, &filter.predicate);
        }
        qb.push(")");
    }

    fn push_order(&self, qb: &mut QueryBuilder<'_, Sqlite>) {
        qb.push(" ORDER BY ");
        for (slot, direction) in &self.orders {
            qb.push(format!(
                "json_extract({}, '$') {}, ",
                slot.column_name(),
                direction.as_str().to_uppercase()
            ));
        }
        qb.push("row_number ASC, created_at ASC");
    }

    fn select(&self) -> QueryBuilder<'_, Sqlite> {
        let mut qb = QueryBuilder::new(format!(
            "SELECT {} FROM butir_data",
            butir_data::SELECT_COLUMNS
        ));
        self.push_where(&mut qb);
        self.push_order(&mut qb);
        qb
    }

    fn hydrate(&self, rows: Vec<RawRow>) -> Vec<DataRow> {
        rows.into_iter()
            .map(|row| {
                if self.raw {
                    DataRow::raw(row)
                } else {
                    DataRow::named(row, &self.schema)
                }
            })
            .collect()
    }

    async fn fetch(&self, mut qb: QueryBuilder<'_, Sqlite>) -> Result<Vec<DataRow>> {
        debug!(sql = qb.sql(), "butir data query");
        let mut conn = self.storage.acquire().await?;
        let rows = qb.build().fetch_all(&mut *conn).await?;
        let raw = rows
            .iter()
            .map(butir_data::parse_row)
            .collect::<Result<Vec<_>>>()?;
        Ok(self.hydrate(raw))
    }

    pub async fn get(&self) -> Result<Vec<DataRow>> {
        self.fetch(self.select()).await
    }

    pub async fn first(&self) -> Result<Option<DataRow>> {
        let mut qb = self.select();
        qb.push(" LIMIT 1");
        Ok(self.fetch(qb).await?.into_iter().next())
    }

    pub async fn count(&self) -> Result<i64> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM butir_data");
        self.push_where(&mut qb);
        debug!(sql = qb.sql(), "butir data count");
        let mut conn = self.storage.acquire().await?;
        let total = qb.build_query_scalar::<i64>().fetch_one(&mut *conn).await?;
        Ok(total)
    }

    /// One page of rows; `page` is 1-based.
    pub async fn paginate(&self, page: i64, per_page: i64) -> Result<Page<DataRow>> {
        let page = page.max(1);
        let per_page = per_page.clamp(1, 500);
        let total = self.count().await?;

        let mut qb = self.select();
        qb.push(" LIMIT ")
            .push_bind(per_page)
            .push(" OFFSET ")
            .push_bind((page - 1) * per_page);
        let items = self.fetch(qb).await?;
        Ok(Page::new(items, total, page, per_page))
    }
}

fn push_predicate(qb: &mut QueryBuilder<'_, Sqlite>, predicate: &Predicate) {
    match predicate {
        Predicate::Compare(slot, comparison, value) => {
            let column = slot.column_name();
            match (comparison, value) {
                (Comparison::Equal, Value::Null) => {
                    qb.push(format!("{column} IS NULL"));
                }
                (Comparison::NotEqual, Value::Null) => {
                    qb.push(format!("{column} IS NOT NULL"));
                }
                (Comparison::Like, value) => {
                    qb.push(format!("json_extract({column}, '$') LIKE "));
                    push_value(qb, value);
                }
                (comparison, value) => {
                    qb.push(format!(
                        "json_extract({column}, '$') {} ",
                        comparison.as_str()
                    ));
                    push_value(qb, value);
                }
            }
        }
        Predicate::In(slot, values) => {
            if values.is_empty() {
                qb.push("0 = 1");
                return;
            }
            qb.push(format!("json_extract({}, '$') IN (", slot.column_name()));
            for (index, value) in values.iter().enumerate() {
                if index > 0 {
                    qb.push(", ");
                }
                push_value(qb, value);
            }
            qb.push(")");
        }
        Predicate::Null(slot) => {
            qb.push(format!(
                "({0} IS NULL OR json_type({0}) = 'null')",
                slot.column_name()
            ));
        }
    }
}

/// Binds a JSON value with the SQLite type `json_extract` yields for it.
fn push_value(qb: &mut QueryBuilder<'_, Sqlite>, value: &Value) {
    match value {
        Value::Null => {
            qb.push("NULL");
        }
        Value::Bool(b) => {
            qb.push_bind(i64::from(*b));
        }
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                qb.push_bind(i);
            } else {
                qb.push_bind(n.as_f64().unwrap_or_default());
            }
        }
        Value::String(s) => {
            qb.push_bind(s.clone());
        }
        Value::Array(_) | Value::Object(_) => {
            qb.push_bind(value.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_math() {
        let page: Page<()> = Page::new(vec![], 41, 2, 20);
        assert_eq!(page.last_page, 3);
        let empty: Page<()> = Page::new(vec![], 0, 1, 20);
        assert_eq!(empty.last_page, 1);
    }

    #[test]
    fn comparison_parses_operators() {
        assert_eq!("<=".parse::<Comparison>().unwrap(), Comparison::LessOrEqual);
        assert_eq!(Comparison::Like.as_str(), "like");
        assert!("<>".parse::<Comparison>().is_err());
    }
}
