use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde_json::{json, Value};
use sqlx::{Row, SqlitePool};
use tracing::info;

use super::MigrationError;
use crate::db;
use crate::export::DatasetHeader;
use crate::id::new_uuid;
use crate::import::{ImportError, ImportSource};
use crate::model;
use crate::tables::TableDescriptor;
use crate::time::now_ms;

const LEGACY_SCHEMA_MARKER: &str = "legacy-edition-3";
const LEGACY_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Adapter over the legacy edition's database file.
///
/// The old schema is differently shaped in every way that matters: no
/// external identifiers, money as floating currency units, flipped
/// category type codes, dates as local text and attachments as an `images`
/// table keyed by file name. Everything is read and mapped up front into
/// current row shapes (uuid references included, identifiers freshly
/// minted), after which this behaves as a regular import source. Tables the
/// legacy edition never had read as empty.
pub struct LegacyDatabase {
    path: PathBuf,
    pool: Option<SqlitePool>,
    rows: HashMap<&'static str, Vec<Value>>,
}

impl LegacyDatabase {
    pub async fn open(path: &Path) -> Result<Self, MigrationError> {
        let pool =
            db::open_sqlite_readonly(path)
                .await
                .map_err(|err| MigrationError::LegacyOpen {
                    path: path.display().to_string(),
                    source: err,
                })?;
        let rows = map_all(&pool).await?;
        info!(
            target: "walletbook",
            event = "legacy_database_mapped",
            path = %path.display(),
            rows = rows.values().map(Vec::len).sum::<usize>()
        );
        Ok(Self {
            path: path.to_path_buf(),
            pool: Some(pool),
            rows,
        })
    }

    /// Close the legacy handle and physically remove the file. Must happen
    /// after the import committed and before attachment relocation; the
    /// open handle holds the lock that would block deletion.
    pub async fn close_and_delete(mut self) -> Result<(), MigrationError> {
        if let Some(pool) = self.pool.take() {
            pool.close().await;
        }
        fs::remove_file(&self.path).map_err(|err| MigrationError::Io {
            path: self.path.display().to_string(),
            source: err,
        })
    }
}

impl ImportSource for LegacyDatabase {
    fn header(&mut self) -> Result<DatasetHeader, ImportError> {
        // The adapter emits current row shapes, so the header carries the
        // current app version; the schema marker records provenance.
        Ok(DatasetHeader {
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            schema_version: LEGACY_SCHEMA_MARKER.to_string(),
            created_at: chrono::Utc::now()
                .to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        })
    }

    fn read_table(&mut self, table: &TableDescriptor) -> Result<Vec<Value>, ImportError> {
        Ok(self.rows.get(table.name).cloned().unwrap_or_default())
    }

    fn close(&mut self) -> Result<(), ImportError> {
        Ok(())
    }
}

async fn map_all(
    pool: &SqlitePool,
) -> Result<HashMap<&'static str, Vec<Value>>, MigrationError> {
    let now = now_ms();
    let mut out: HashMap<&'static str, Vec<Value>> = HashMap::new();

    // wallets, plus currencies synthesized from the ISO codes they use;
    // the legacy edition had no currency table of its own.
    let wallet_rows = fetch(pool, "SELECT _id, name, currency, initial_money, hidden FROM wallet ORDER BY _id").await?;
    let mut currencies: Vec<String> = Vec::new();
    let mut wallets = Vec::new();
    let mut wallet_uuids: HashMap<i64, String> = HashMap::new();
    for (placement, row) in wallet_rows.iter().enumerate() {
        let legacy_id: i64 = get(row, "_id")?;
        let name: String = get(row, "name")?;
        let iso: String = get(row, "currency")?;
        let initial_money: f64 = get(row, "initial_money")?;
        let hidden: i64 = get(row, "hidden")?;

        if !currencies.contains(&iso) {
            currencies.push(iso.clone());
        }
        let uuid = new_uuid();
        wallet_uuids.insert(legacy_id, uuid.clone());
        wallets.push(json!({
            "uuid": uuid,
            "name": name,
            "icon": null,
            "currency": iso,
            "start_money": to_minor_units(initial_money),
            "count_in_total": if hidden == 0 { 1 } else { 0 },
            "archived": hidden,
            "placement": placement as i64,
            "tag": null,
            "last_edit": now,
            "deleted": 0,
        }));
    }
    out.insert(
        "currencies",
        currencies
            .iter()
            .map(|iso| {
                json!({
                    "uuid": new_uuid(),
                    "iso": iso,
                    "name": iso,
                    "symbol": null,
                    "decimals": 2,
                    "favourite": 0,
                    "tag": null,
                    "last_edit": now,
                    "deleted": 0,
                })
            })
            .collect(),
    );
    out.insert("wallets", wallets);

    // categories: legacy type codes are flipped (0 = expense, 1 = income)
    // and the parent link is by legacy rowid.
    let category_rows =
        fetch(pool, "SELECT _id, name, type, parent_id FROM category ORDER BY _id").await?;
    let mut category_uuids: HashMap<i64, String> = HashMap::new();
    for row in &category_rows {
        let legacy_id: i64 = get(row, "_id")?;
        category_uuids.insert(legacy_id, new_uuid());
    }
    let mut categories = Vec::new();
    for row in &category_rows {
        let legacy_id: i64 = get(row, "_id")?;
        let name: String = get(row, "name")?;
        let legacy_type: i64 = get(row, "type")?;
        let parent_id: Option<i64> = get_opt(row, "parent_id")?;

        let kind = match legacy_type {
            0 => model::CATEGORY_TYPE_EXPENSE,
            1 => model::CATEGORY_TYPE_INCOME,
            other => {
                return Err(MigrationError::LegacySchema {
                    detail: format!("unknown legacy category type {other}"),
                })
            }
        };
        let parent = parent_id
            .and_then(|id| category_uuids.get(&id))
            .map(|uuid| Value::String(uuid.clone()))
            .unwrap_or(Value::Null);
        categories.push(json!({
            "uuid": category_uuids[&legacy_id],
            "name": name,
            "icon": null,
            "type": kind,
            "parent": parent,
            "show_report": 1,
            "tag": null,
            "last_edit": now,
            "deleted": 0,
        }));
    }
    out.insert("categories", categories);

    // transactions: signed float amounts become direction + minor units,
    // text dates become epoch milliseconds.
    let transaction_rows = fetch(
        pool,
        "SELECT _id, wallet_id, category_id, description, amount, date FROM \"transaction\" ORDER BY _id",
    )
    .await?;
    let mut transaction_uuids: HashMap<i64, String> = HashMap::new();
    let mut transactions = Vec::new();
    for row in &transaction_rows {
        let legacy_id: i64 = get(row, "_id")?;
        let wallet_id: i64 = get(row, "wallet_id")?;
        let category_id: i64 = get(row, "category_id")?;
        let description: Option<String> = get_opt(row, "description")?;
        let amount: f64 = get(row, "amount")?;
        let date: String = get(row, "date")?;

        let wallet_uuid =
            wallet_uuids
                .get(&wallet_id)
                .ok_or_else(|| MigrationError::LegacySchema {
                    detail: format!("transaction {legacy_id} references unknown wallet {wallet_id}"),
                })?;
        let category_uuid =
            category_uuids
                .get(&category_id)
                .ok_or_else(|| MigrationError::LegacySchema {
                    detail: format!(
                        "transaction {legacy_id} references unknown category {category_id}"
                    ),
                })?;

        let uuid = new_uuid();
        transaction_uuids.insert(legacy_id, uuid.clone());
        transactions.push(json!({
            "uuid": uuid,
            "money": to_minor_units(amount.abs()),
            "date": parse_legacy_date(&date)?,
            "description": description,
            "category": category_uuid,
            "direction": if amount < 0.0 { model::DIRECTION_EXPENSE } else { model::DIRECTION_INCOME },
            "type": 0,
            "wallet": wallet_uuid,
            "place": null,
            "note": null,
            "saving": null,
            "debt": null,
            "event": null,
            "recurrence": null,
            "confirmed": 1,
            "count_in_total": 1,
            "tag": null,
            "last_edit": now,
            "deleted": 0,
        }));
    }
    out.insert("transactions", transactions);

    // images become attachment rows plus their transaction links; the bytes
    // themselves move later, keyed by the file name recorded here.
    let image_rows =
        fetch(pool, "SELECT _id, transaction_id, file_name, size FROM images ORDER BY _id").await?;
    let mut attachments = Vec::new();
    let mut links = Vec::new();
    for row in &image_rows {
        let legacy_id: i64 = get(row, "_id")?;
        let transaction_id: i64 = get(row, "transaction_id")?;
        let file_name: String = get(row, "file_name")?;
        let size: i64 = get(row, "size")?;

        let transaction_uuid = transaction_uuids.get(&transaction_id).ok_or_else(|| {
            MigrationError::LegacySchema {
                detail: format!("image {legacy_id} references unknown transaction {transaction_id}"),
            }
        })?;

        let media_type = mime_guess::from_path(&file_name)
            .first_raw()
            .map(|mime| Value::String(mime.to_string()))
            .unwrap_or(Value::Null);
        let attachment_uuid = new_uuid();
        attachments.push(json!({
            "uuid": attachment_uuid,
            "file": file_name,
            "type": media_type,
            "size": size,
            "note": null,
            "tag": null,
            "last_edit": now,
            "deleted": 0,
        }));
        links.push(json!({
            "uuid": new_uuid(),
            "transaction": transaction_uuid,
            "attachment": attachment_uuid,
            "tag": null,
            "last_edit": now,
            "deleted": 0,
        }));
    }
    out.insert("attachments", attachments);
    out.insert("transaction_attachments", links);

    Ok(out)
}

async fn fetch(
    pool: &SqlitePool,
    sql: &str,
) -> Result<Vec<sqlx::sqlite::SqliteRow>, MigrationError> {
    sqlx::query(sql)
        .fetch_all(pool)
        .await
        .map_err(|err| MigrationError::LegacySchema {
            detail: err.to_string(),
        })
}

fn get<'r, T>(row: &'r sqlx::sqlite::SqliteRow, column: &str) -> Result<T, MigrationError>
where
    T: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get(column).map_err(|err| MigrationError::LegacySchema {
        detail: format!("column {column}: {err}"),
    })
}

fn get_opt<'r, T>(
    row: &'r sqlx::sqlite::SqliteRow,
    column: &str,
) -> Result<Option<T>, MigrationError>
where
    Option<T>: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get(column).map_err(|err| MigrationError::LegacySchema {
        detail: format!("column {column}: {err}"),
    })
}

fn to_minor_units(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

fn parse_legacy_date(raw: &str) -> Result<i64, MigrationError> {
    NaiveDateTime::parse_from_str(raw, LEGACY_DATE_FORMAT)
        .map(|dt| dt.and_utc().timestamp_millis())
        .map_err(|err| MigrationError::LegacySchema {
            detail: format!("date {raw:?}: {err}"),
        })
}
