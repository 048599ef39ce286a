use std::collections::HashMap;

use serde_json::{Map, Value};
use sqlx::{Sqlite, Transaction};
use tracing::debug;

use super::ImportError;
use crate::store;
use crate::tables::TableDescriptor;

/// The session-scoped identifier translation map.
///
/// Keys pair the owning table with the external uuid because uuids from
/// different tables live in different identity spaces even when globally
/// unique; a dangling reference must not accidentally resolve through
/// another table's row.
#[derive(Debug, Default)]
pub struct IdMap {
    entries: HashMap<(&'static str, String), i64>,
}

impl IdMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, table: &'static str, uuid: &str, local_id: i64) {
        self.entries.insert((table, uuid.to_string()), local_id);
    }

    pub fn resolve(&self, table: &'static str, uuid: &str) -> Option<i64> {
        self.entries.get(&(table, uuid.to_string())).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One import run: owns the translation map and the original-name index for
/// attachments. Created fresh per run and discarded with it; reusing a map
/// across runs could silently mis-link records from a different dataset.
#[derive(Debug, Default)]
pub struct ImportSession {
    map: IdMap,
    attachment_names: HashMap<String, String>,
}

impl ImportSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id_map(&self) -> &IdMap {
        &self.map
    }

    /// The new external identifier assigned to the attachment row whose
    /// original file name matched, if one was imported this session. Lets
    /// blob relocation run independently of row import.
    pub fn attachment_id_for(&self, original_name: &str) -> Option<&str> {
        self.attachment_names
            .get(original_name)
            .map(String::as_str)
    }

    pub fn attachment_names(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attachment_names
            .iter()
            .map(|(name, uuid)| (name.as_str(), uuid.as_str()))
    }

    /// Import one table's rows. Every foreign reference is translated from
    /// the source uuid space to destination local ids; the rows' own uuids
    /// are recorded so later tables can refer back to them. Any row-level
    /// failure aborts the whole call.
    pub async fn import_table(
        &mut self,
        tx: &mut Transaction<'_, Sqlite>,
        desc: &TableDescriptor,
        rows: Vec<Value>,
    ) -> Result<u64, ImportError> {
        let mut objects = Vec::with_capacity(rows.len());
        for row in rows {
            match row {
                Value::Object(object) => objects.push(object),
                _ => {
                    return Err(ImportError::MalformedRow {
                        table: desc.name.to_string(),
                    })
                }
            }
        }

        let imported = if desc.has_self_reference() {
            self.import_self_referential(tx, desc, objects).await?
        } else {
            let count = objects.len() as u64;
            for object in objects {
                self.import_row(tx, desc, object).await?;
            }
            count
        };

        debug!(
            target: "walletbook",
            event = "import_table",
            table = desc.name,
            rows = imported
        );
        Ok(imported)
    }

    /// Rows of a self-referential table (categories and their parents) are
    /// imported in dependency passes: each pass takes every row whose
    /// references already resolve. A pass that makes no progress means a
    /// dangling parent or a cycle.
    async fn import_self_referential(
        &mut self,
        tx: &mut Transaction<'_, Sqlite>,
        desc: &TableDescriptor,
        rows: Vec<Map<String, Value>>,
    ) -> Result<u64, ImportError> {
        let mut pending = rows;
        let mut imported = 0u64;
        while !pending.is_empty() {
            let mut next = Vec::new();
            let mut progressed = false;
            for object in pending {
                if self.references_resolve(desc, &object) {
                    self.import_row(tx, desc, object).await?;
                    imported += 1;
                    progressed = true;
                } else {
                    next.push(object);
                }
            }
            if !progressed {
                // Surface the first unresolved reference of the stuck set.
                return match next.first() {
                    Some(stuck) => Err(self.first_unresolved(desc, stuck)),
                    None => Ok(imported),
                };
            }
            pending = next;
        }
        Ok(imported)
    }

    fn references_resolve(&self, desc: &TableDescriptor, object: &Map<String, Value>) -> bool {
        desc.foreign_keys.iter().all(|fk| {
            match object.get(fk.column) {
                None | Some(Value::Null) => true,
                Some(Value::String(uuid)) => self.map.resolve(fk.references, uuid).is_some(),
                Some(_) => false,
            }
        })
    }

    fn first_unresolved(
        &self,
        desc: &TableDescriptor,
        object: &Map<String, Value>,
    ) -> ImportError {
        for fk in desc.foreign_keys {
            match object.get(fk.column) {
                None | Some(Value::Null) => continue,
                Some(Value::String(uuid)) => {
                    if self.map.resolve(fk.references, uuid).is_none() {
                        return ImportError::UnresolvedReference {
                            table: desc.name.to_string(),
                            column: fk.column.to_string(),
                            references: fk.references.to_string(),
                            uuid: uuid.clone(),
                        };
                    }
                }
                Some(_) => {
                    return ImportError::InvalidReference {
                        table: desc.name.to_string(),
                        column: fk.column.to_string(),
                    }
                }
            }
        }
        ImportError::MalformedRow {
            table: desc.name.to_string(),
        }
    }

    async fn import_row(
        &mut self,
        tx: &mut Transaction<'_, Sqlite>,
        desc: &TableDescriptor,
        mut object: Map<String, Value>,
    ) -> Result<(), ImportError> {
        // Local identities are store-private; a stray `id` in the stream is
        // dropped rather than trusted.
        object.remove("id");

        let uuid = match object.get("uuid") {
            Some(Value::String(uuid)) if !uuid.is_empty() => uuid.clone(),
            _ => {
                return Err(ImportError::MissingField {
                    table: desc.name.to_string(),
                    field: "uuid".to_string(),
                })
            }
        };

        for fk in desc.foreign_keys {
            let resolved = match object.get(fk.column) {
                None | Some(Value::Null) => continue,
                Some(Value::String(reference)) => {
                    self.map.resolve(fk.references, reference).ok_or_else(|| {
                        ImportError::UnresolvedReference {
                            table: desc.name.to_string(),
                            column: fk.column.to_string(),
                            references: fk.references.to_string(),
                            uuid: reference.clone(),
                        }
                    })?
                }
                Some(_) => {
                    return Err(ImportError::InvalidReference {
                        table: desc.name.to_string(),
                        column: fk.column.to_string(),
                    })
                }
            };
            object.insert(fk.column.to_string(), Value::from(resolved));
        }

        let local_id = store::insert_or_replace_tx(tx, desc.name, &object).await?;
        self.map.record(desc.name, &uuid, local_id);

        if desc.name == "attachments" {
            if let Some(Value::String(file)) = object.get("file") {
                self.attachment_names.insert(file.clone(), uuid);
            }
        }

        Ok(())
    }
}
