use std::collections::{BTreeMap, HashMap};

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::info;

use crate::schema;
use crate::store::{quote_ident, Store, StoreError};
use crate::tables::{self, TableDescriptor, TableOrderError};

pub mod bundle;
pub mod manifest;

pub use bundle::BundleSink;

/// Leading record of every serialized dataset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DatasetHeader {
    pub app_version: String,
    pub schema_version: String,
    pub created_at: String,
}

impl DatasetHeader {
    pub fn current() -> Self {
        Self {
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            schema_version: schema::SCHEMA_VERSION.to_string(),
            created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize row for table {table}: {source}")]
    Serialize {
        table: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("table order error: {0}")]
    Order(#[from] TableOrderError),
    #[error("table {table} column {column} references missing local id {id}")]
    DanglingReference {
        table: String,
        column: String,
        id: i64,
    },
}

/// A pluggable destination for a serialized dataset.
///
/// `open` is called exactly once before any table, tables arrive in
/// topological order, and `close` always runs, error paths included.
/// Issuing tables out of order is a caller error the sink does not correct.
pub trait ExportSink {
    fn open(&mut self, header: &DatasetHeader) -> Result<(), ExportError>;
    fn write_table(
        &mut self,
        table: &TableDescriptor,
        rows: &[Value],
    ) -> Result<(), ExportError>;
    fn close(&mut self) -> Result<(), ExportError>;
}

#[derive(Debug, Clone, Default)]
pub struct ExportSummary {
    pub tables: BTreeMap<String, u64>,
}

/// Stream the whole store out through a sink.
///
/// Rows cross the boundary in portable form: the local `id` is stripped and
/// every foreign-key column is rewritten from the referenced row's local id
/// to its external uuid. Tombstoned rows are exported like any other.
pub async fn export_dataset(
    store: &Store,
    sink: &mut dyn ExportSink,
) -> Result<ExportSummary, ExportError> {
    let header = DatasetHeader::current();
    let order = tables::topological_order()?;

    let result = match sink.open(&header) {
        Ok(()) => stream_tables(store, sink, &order).await,
        Err(err) => Err(err),
    };
    // The sink is released on every path, including failed opens.
    let close_result = sink.close();

    let summary = result?;
    close_result?;

    info!(
        target: "walletbook",
        event = "export_complete",
        tables = summary.tables.len(),
        rows = summary.tables.values().sum::<u64>()
    );
    Ok(summary)
}

async fn stream_tables(
    store: &Store,
    sink: &mut dyn ExportSink,
    order: &[&'static TableDescriptor],
) -> Result<ExportSummary, ExportError> {
    let mut summary = ExportSummary::default();
    for desc in order {
        let rows = store.query_table(desc.name).await?;
        let portable = make_portable(store, desc, rows).await?;
        sink.write_table(desc, &portable)?;
        summary
            .tables
            .insert(desc.name.to_string(), portable.len() as u64);
    }
    Ok(summary)
}

async fn make_portable(
    store: &Store,
    desc: &TableDescriptor,
    rows: Vec<Value>,
) -> Result<Vec<Value>, ExportError> {
    // One uuid lookup per referenced table, shared across all rows.
    let mut uuid_maps: HashMap<&'static str, HashMap<i64, String>> = HashMap::new();
    for fk in desc.foreign_keys {
        if !uuid_maps.contains_key(fk.references) {
            uuid_maps.insert(fk.references, load_uuid_map(store, fk.references).await?);
        }
    }

    let mut out = Vec::with_capacity(rows.len());
    for mut row in rows {
        let Some(object) = row.as_object_mut() else {
            continue;
        };
        object.remove("id");
        for fk in desc.foreign_keys {
            let Some(value) = object.get(fk.column) else {
                continue;
            };
            if value.is_null() {
                continue;
            }
            let local_id = value
                .as_i64()
                .ok_or_else(|| ExportError::DanglingReference {
                    table: desc.name.to_string(),
                    column: fk.column.to_string(),
                    id: -1,
                })?;
            let uuid = uuid_maps[fk.references].get(&local_id).ok_or_else(|| {
                ExportError::DanglingReference {
                    table: desc.name.to_string(),
                    column: fk.column.to_string(),
                    id: local_id,
                }
            })?;
            object.insert(fk.column.to_string(), Value::String(uuid.clone()));
        }
        out.push(row);
    }
    Ok(out)
}

async fn load_uuid_map(
    store: &Store,
    table: &str,
) -> Result<HashMap<i64, String>, ExportError> {
    let sql = format!("SELECT id, uuid FROM {}", quote_ident(table));
    let pairs: Vec<(i64, String)> = sqlx::query_as(&sql).fetch_all(store.pool()).await?;
    Ok(pairs.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{self, Category, Currency};
    use crate::time::now_ms;
    use serde_json::json;
    use sqlx::sqlite::SqlitePoolOptions;

    #[derive(Default)]
    struct RecordingSink {
        opened: bool,
        closed: bool,
        tables: Vec<(String, Vec<Value>)>,
    }

    impl ExportSink for RecordingSink {
        fn open(&mut self, _header: &DatasetHeader) -> Result<(), ExportError> {
            self.opened = true;
            Ok(())
        }

        fn write_table(
            &mut self,
            table: &TableDescriptor,
            rows: &[Value],
        ) -> Result<(), ExportError> {
            self.tables.push((table.name.to_string(), rows.to_vec()));
            Ok(())
        }

        fn close(&mut self) -> Result<(), ExportError> {
            self.closed = true;
            Ok(())
        }
    }

    struct FailingSink {
        closed: bool,
    }

    impl ExportSink for FailingSink {
        fn open(&mut self, _header: &DatasetHeader) -> Result<(), ExportError> {
            Ok(())
        }

        fn write_table(
            &mut self,
            _table: &TableDescriptor,
            _rows: &[Value],
        ) -> Result<(), ExportError> {
            Err(ExportError::Io {
                path: "sink".into(),
                source: std::io::Error::other("sink unavailable"),
            })
        }

        fn close(&mut self) -> Result<(), ExportError> {
            self.closed = true;
            Ok(())
        }
    }

    async fn seeded_store() -> Store {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::query("PRAGMA foreign_keys=ON;")
            .execute(&pool)
            .await
            .unwrap();
        crate::schema::apply_baseline(&pool).await.unwrap();
        Store::new(pool)
    }

    #[tokio::test]
    async fn tables_stream_in_registry_order_and_sink_closes() {
        let store = seeded_store().await;
        let mut sink = RecordingSink::default();
        export_dataset(&store, &mut sink).await.unwrap();

        assert!(sink.opened);
        assert!(sink.closed);
        let streamed: Vec<&str> = sink.tables.iter().map(|(n, _)| n.as_str()).collect();
        let expected: Vec<&str> = tables::REGISTRY.iter().map(|d| d.name).collect();
        assert_eq!(streamed, expected);
    }

    #[tokio::test]
    async fn sink_failure_aborts_but_still_closes() {
        let store = seeded_store().await;
        let mut sink = FailingSink { closed: false };
        let err = export_dataset(&store, &mut sink).await.unwrap_err();
        assert!(matches!(err, ExportError::Io { .. }));
        assert!(sink.closed);
    }

    #[tokio::test]
    async fn self_reference_exports_parent_uuid() {
        let store = seeded_store().await;
        let parent = Category {
            uuid: crate::id::new_uuid(),
            name: "Essentials".into(),
            icon: None,
            kind: model::CATEGORY_TYPE_EXPENSE,
            parent: None,
            show_report: 1,
            tag: None,
            last_edit: now_ms(),
            deleted: 0,
        };
        let parent_id = store
            .insert_or_replace("categories", &model::to_row(&parent))
            .await
            .unwrap();
        let child = Category {
            uuid: crate::id::new_uuid(),
            name: "Groceries".into(),
            icon: None,
            kind: model::CATEGORY_TYPE_EXPENSE,
            parent: Some(parent_id),
            show_report: 1,
            tag: None,
            last_edit: now_ms(),
            deleted: 0,
        };
        store
            .insert_or_replace("categories", &model::to_row(&child))
            .await
            .unwrap();

        let mut sink = RecordingSink::default();
        export_dataset(&store, &mut sink).await.unwrap();

        let (_, rows) = sink
            .tables
            .iter()
            .find(|(n, _)| n == "categories")
            .unwrap();
        assert_eq!(rows.len(), 2);
        let exported_child = rows
            .iter()
            .find(|r| r["uuid"] == json!(child.uuid))
            .unwrap();
        assert_eq!(exported_child["parent"], json!(parent.uuid));
        assert!(exported_child.get("id").is_none());
    }

    #[tokio::test]
    async fn currency_iso_is_not_translated() {
        let store = seeded_store().await;
        let currency = Currency {
            uuid: crate::id::new_uuid(),
            iso: "GBP".into(),
            name: "Pound Sterling".into(),
            symbol: Some("£".into()),
            decimals: 2,
            favourite: 0,
            tag: None,
            last_edit: now_ms(),
            deleted: 0,
        };
        store
            .insert_or_replace("currencies", &model::to_row(&currency))
            .await
            .unwrap();
        let wallet = crate::model::Wallet {
            uuid: crate::id::new_uuid(),
            name: "Current".into(),
            icon: None,
            currency: "GBP".into(),
            start_money: 0,
            count_in_total: 1,
            archived: 0,
            placement: 0,
            tag: None,
            last_edit: now_ms(),
            deleted: 0,
        };
        store
            .insert_or_replace("wallets", &model::to_row(&wallet))
            .await
            .unwrap();

        let mut sink = RecordingSink::default();
        export_dataset(&store, &mut sink).await.unwrap();
        let (_, rows) = sink.tables.iter().find(|(n, _)| n == "wallets").unwrap();
        assert_eq!(rows[0]["currency"], json!("GBP"));
    }
}
