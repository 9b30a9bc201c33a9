//! # Raw Query Surface
//!
//! Untyped access to the store: run any SQL with positional parameters and
//! get column names plus dynamically typed cells back. Repositories use typed
//! queries; this is for diagnostics and administration.

use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{Column, Row, Sqlite, SqlitePool, TypeInfo, ValueRef};

use crate::error::DbResult;

/// One SQLite value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl SqlValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SqlValue::Text(v) => Some(v),
            _ => None,
        }
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Integer(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(SqlValue::Null)
    }
}

/// Result set of [`execute_query`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<SqlValue>>,
}

impl QueryResult {
    /// Single cell by row index and column name.
    pub fn get(&self, row: usize, column: &str) -> Option<&SqlValue> {
        let idx = self.columns.iter().position(|c| c == column)?;
        self.rows.get(row)?.get(idx)
    }
}

fn bind_all<'q>(
    mut query: sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>,
    params: &[SqlValue],
) -> sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>> {
    for param in params {
        query = match param {
            SqlValue::Null => query.bind(None::<i64>),
            SqlValue::Integer(v) => query.bind(*v),
            SqlValue::Real(v) => query.bind(*v),
            SqlValue::Text(v) => query.bind(v.clone()),
            SqlValue::Blob(v) => query.bind(v.clone()),
        };
    }
    query
}

fn decode_cell(row: &SqliteRow, idx: usize) -> DbResult<SqlValue> {
    let raw = row.try_get_raw(idx)?;
    if raw.is_null() {
        return Ok(SqlValue::Null);
    }
    let storage = raw.type_info().name().to_string();

    let value = match storage.as_str() {
        "INTEGER" | "BOOLEAN" => SqlValue::Integer(row.try_get_unchecked::<i64, _>(idx)?),
        "REAL" | "NUMERIC" => SqlValue::Real(row.try_get_unchecked::<f64, _>(idx)?),
        "BLOB" => SqlValue::Blob(row.try_get_unchecked::<Vec<u8>, _>(idx)?),
        _ => SqlValue::Text(row.try_get_unchecked::<String, _>(idx)?),
    };
    Ok(value)
}

/// Runs a statement that returns rows.
pub async fn execute_query(pool: &SqlitePool, sql: &str, params: &[SqlValue]) -> DbResult<QueryResult> {
    let rows = bind_all(sqlx::query(sql), params).fetch_all(pool).await?;

    let columns = match rows.first() {
        Some(row) => row.columns().iter().map(|c| c.name().to_string()).collect(),
        None => Vec::new(),
    };

    let mut out = Vec::with_capacity(rows.len());
    for row in &rows {
        let mut cells = Vec::with_capacity(row.len());
        for idx in 0..row.len() {
            cells.push(decode_cell(row, idx)?);
        }
        out.push(cells);
    }

    Ok(QueryResult { columns, rows: out })
}

/// Runs a statement and returns the number of rows it changed.
pub async fn execute_statement(pool: &SqlitePool, sql: &str, params: &[SqlValue]) -> DbResult<u64> {
    let result = bind_all(sqlx::query(sql), params).execute(pool).await?;
    Ok(result.rows_affected())
}
