use serde_json::{Map, Value};
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Row, Sqlite, SqlitePool, Transaction, TypeInfo, ValueRef};
use thiserror::Error;

use crate::tables;

/// Minimal gateway over the relational store.
///
/// The engine never builds domain-specific SQL; everything goes through
/// these four operations with table names validated against the registry.
/// Insert conflict policy is replace: a row whose uuid (or other natural
/// key) collides with an existing row overwrites it.
#[derive(Debug, Clone)]
pub struct Store {
    pool: SqlitePool,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unknown table: {0}")]
    UnknownTable(String),
    #[error("row payload for table {table} is not an object of scalars")]
    InvalidPayload { table: String },
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Store {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Fetch the full row set of a table, tombstones included, in stable
    /// rowid order.
    pub async fn query_table(&self, table: &str) -> Result<Vec<Value>, StoreError> {
        ensure_table(table)?;
        let sql = format!("SELECT * FROM {} ORDER BY id", quote_ident(table));
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(row_to_value).collect())
    }

    /// Fetch rows matching a single column equality.
    pub async fn query_where(
        &self,
        table: &str,
        column: &str,
        value: &Value,
    ) -> Result<Vec<Value>, StoreError> {
        ensure_table(table)?;
        let sql = format!(
            "SELECT * FROM {} WHERE {} = ?1 ORDER BY id",
            quote_ident(table),
            quote_ident(column)
        );
        let query = bind_value(sqlx::query(&sql), value);
        let rows = query.fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(row_to_value).collect())
    }

    /// Insert a row, replacing any natural-key collision. Returns the local
    /// identity the store assigned.
    pub async fn insert_or_replace(
        &self,
        table: &str,
        values: &Map<String, Value>,
    ) -> Result<i64, StoreError> {
        ensure_table(table)?;
        let (sql, columns) = insert_sql(table, values)?;
        let mut query = sqlx::query(&sql);
        for column in &columns {
            query = bind_value(query, &values[column]);
        }
        let result = query.execute(&self.pool).await?;
        Ok(result.last_insert_rowid())
    }

    /// Update matching rows with the given values; returns affected count.
    pub async fn update(
        &self,
        table: &str,
        values: &Map<String, Value>,
        filter_column: &str,
        filter_value: &Value,
    ) -> Result<u64, StoreError> {
        ensure_table(table)?;
        if values.is_empty() {
            return Ok(0);
        }
        let columns: Vec<&String> = values.keys().collect();
        let set_clause: Vec<String> = columns
            .iter()
            .map(|c| format!("{} = ?", quote_ident(c)))
            .collect();
        let sql = format!(
            "UPDATE {} SET {} WHERE {} = ?",
            quote_ident(table),
            set_clause.join(", "),
            quote_ident(filter_column)
        );
        let mut query = sqlx::query(&sql);
        for column in &columns {
            query = bind_value(query, &values[column.as_str()]);
        }
        query = bind_value(query, filter_value);
        let result = query.execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    /// Delete matching rows; returns affected count. Physical removal;
    /// normal callers tombstone via `update` instead.
    pub async fn delete(
        &self,
        table: &str,
        filter_column: &str,
        filter_value: &Value,
    ) -> Result<u64, StoreError> {
        ensure_table(table)?;
        let sql = format!(
            "DELETE FROM {} WHERE {} = ?1",
            quote_ident(table),
            quote_ident(filter_column)
        );
        let query = bind_value(sqlx::query(&sql), filter_value);
        let result = query.execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}

/// Transaction-scoped insert used by the import path, which must run every
/// table of a session inside one destination transaction.
pub async fn insert_or_replace_tx(
    tx: &mut Transaction<'_, Sqlite>,
    table: &str,
    values: &Map<String, Value>,
) -> Result<i64, StoreError> {
    ensure_table(table)?;
    let (sql, columns) = insert_sql(table, values)?;
    let mut query = sqlx::query(&sql);
    for column in &columns {
        query = bind_value(query, &values[column]);
    }
    let result = query.execute(tx.as_mut()).await?;
    Ok(result.last_insert_rowid())
}

fn ensure_table(table: &str) -> Result<(), StoreError> {
    if tables::descriptor(table).is_some() {
        Ok(())
    } else {
        Err(StoreError::UnknownTable(table.to_string()))
    }
}

fn insert_sql(
    table: &str,
    values: &Map<String, Value>,
) -> Result<(String, Vec<String>), StoreError> {
    if values.is_empty() {
        return Err(StoreError::InvalidPayload {
            table: table.to_string(),
        });
    }
    let columns: Vec<String> = values.keys().cloned().collect();
    let column_list: Vec<String> = columns.iter().map(|c| quote_ident(c)).collect();
    let placeholders: Vec<&str> = columns.iter().map(|_| "?").collect();
    let sql = format!(
        "INSERT OR REPLACE INTO {} ({}) VALUES ({})",
        quote_ident(table),
        column_list.join(", "),
        placeholders.join(", ")
    );
    Ok((sql, columns))
}

pub(crate) fn quote_ident(name: &str) -> String {
    let escaped = name.replace('"', "\"\"");
    format!("\"{}\"", escaped)
}

/// Decode a sqlite row into a JSON object keyed by column name.
pub(crate) fn row_to_value(row: SqliteRow) -> Value {
    let mut map = Map::new();
    for col in row.columns() {
        let idx = col.ordinal();
        let v = row.try_get_raw(idx).ok();
        let val = match v {
            Some(raw) => {
                if raw.is_null() {
                    Value::Null
                } else {
                    match raw.type_info().name() {
                        "INTEGER" => row
                            .try_get::<i64, _>(idx)
                            .map(Value::from)
                            .unwrap_or(Value::Null),
                        "REAL" => row
                            .try_get::<f64, _>(idx)
                            .map(Value::from)
                            .unwrap_or(Value::Null),
                        _ => row
                            .try_get::<String, _>(idx)
                            .map(Value::from)
                            .unwrap_or(Value::Null),
                    }
                }
            }
            None => Value::Null,
        };
        map.insert(col.name().to_string(), val);
    }
    Value::Object(map)
}

pub(crate) fn bind_value<'q>(
    q: sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
    v: &Value,
) -> sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
    match v {
        Value::Null => q.bind(Option::<i64>::None),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                q.bind(i)
            } else if let Some(f) = n.as_f64() {
                q.bind(f)
            } else {
                q.bind(Option::<i64>::None)
            }
        }
        Value::Bool(b) => q.bind(*b as i64),
        Value::String(s) => q.bind(s.clone()),
        _ => q.bind(v.to_string()),
    }
}
