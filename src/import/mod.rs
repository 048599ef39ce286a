use std::collections::BTreeMap;

use semver::Version;
use serde_json::Value;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::export::DatasetHeader;
use crate::schema;
use crate::store::{Store, StoreError};
use crate::tables::{self, TableDescriptor, TableOrderError};

pub mod bundle;
pub mod session;

pub use bundle::BundleSource;
pub use session::{IdMap, ImportSession};

/// Oldest producer whose datasets this importer still accepts.
pub const MIN_SUPPORTED_APP_VERSION: &str = "0.1.0";

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("dataset digest mismatch for {path}")]
    DigestMismatch { path: String },
    #[error("table {table} row count {actual} does not match manifest count {expected}")]
    CountMismatch {
        table: String,
        expected: u64,
        actual: u64,
    },
    #[error("dataset produced by unsupported app version {found} (minimum {minimum})")]
    UnsupportedVersion { found: String, minimum: String },
    #[error("malformed dataset header: {detail}")]
    InvalidHeader { detail: String },
    #[error("malformed row in table {table}")]
    MalformedRow { table: String },
    #[error("missing required field {field} in table {table}")]
    MissingField { table: String, field: String },
    #[error(
        "table {table} column {column} references {references} {uuid}, which was never imported"
    )]
    UnresolvedReference {
        table: String,
        column: String,
        references: String,
        uuid: String,
    },
    #[error("table {table} column {column} carries a non-portable reference")]
    InvalidReference { table: String, column: String },
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("table order error: {0}")]
    Order(#[from] TableOrderError),
}

/// A pluggable origin of a serialized dataset: the steady-state bundle
/// reader or the legacy-schema adapter. Tables are requested in topological
/// order; `close` is called once the run is over, success or failure.
pub trait ImportSource {
    fn header(&mut self) -> Result<DatasetHeader, ImportError>;
    fn read_table(&mut self, table: &TableDescriptor) -> Result<Vec<Value>, ImportError>;
    fn close(&mut self) -> Result<(), ImportError>;
}

#[derive(Debug)]
pub struct ImportOutcome {
    pub header: DatasetHeader,
    pub tables: BTreeMap<String, u64>,
    /// The finished session, kept so post-import steps (attachment blob
    /// relocation) can consult the identifier translations it recorded.
    pub session: ImportSession,
}

/// Re-create a serialized dataset inside the destination store.
///
/// The whole run executes inside one destination transaction: a failure at
/// any table rolls back every row imported so far. The session map created
/// here never outlives the run.
pub async fn import_dataset(
    store: &Store,
    source: &mut dyn ImportSource,
) -> Result<ImportOutcome, ImportError> {
    let result = run_import(store, source).await;

    match source.close() {
        Ok(()) => result,
        Err(close_err) => match result {
            // A close failure on an otherwise clean run still poisons it.
            Ok(_) => Err(close_err),
            Err(err) => {
                warn!(
                    target: "walletbook",
                    event = "import_source_close_failed",
                    error = %close_err
                );
                Err(err)
            }
        },
    }
}

async fn run_import(
    store: &Store,
    source: &mut dyn ImportSource,
) -> Result<ImportOutcome, ImportError> {
    let header = source.header()?;
    ensure_supported(&header)?;
    if header.schema_version != schema::SCHEMA_VERSION {
        warn!(
            target: "walletbook",
            event = "import_schema_drift",
            dataset = %header.schema_version,
            store = %schema::SCHEMA_VERSION
        );
    }

    let order = tables::topological_order()?;
    let mut session = ImportSession::new();
    let mut counts = BTreeMap::new();

    let mut tx = store.pool().begin().await?;
    let mut failure = None;
    for desc in &order {
        let step = match source.read_table(desc) {
            Ok(rows) => session.import_table(&mut tx, desc, rows).await,
            Err(err) => Err(err),
        };
        match step {
            Ok(imported) => {
                counts.insert(desc.name.to_string(), imported);
            }
            Err(err) => {
                failure = Some(err);
                break;
            }
        }
    }

    match failure {
        None => {
            tx.commit().await?;
            info!(
                target: "walletbook",
                event = "import_complete",
                tables = counts.len(),
                rows = counts.values().sum::<u64>()
            );
            Ok(ImportOutcome {
                header,
                tables: counts,
                session,
            })
        }
        Some(err) => {
            if let Err(rb) = tx.rollback().await {
                error!(target: "walletbook", event = "import_rollback_failed", error = %rb);
            } else {
                warn!(target: "walletbook", event = "import_rolled_back", error = %err);
            }
            Err(err)
        }
    }
}

fn ensure_supported(header: &DatasetHeader) -> Result<(), ImportError> {
    let found =
        Version::parse(&header.app_version).map_err(|err| ImportError::InvalidHeader {
            detail: format!("app version {:?}: {err}", header.app_version),
        })?;
    let minimum = Version::parse(MIN_SUPPORTED_APP_VERSION).expect("minimum version parses");
    if found < minimum {
        return Err(ImportError::UnsupportedVersion {
            found: header.app_version.clone(),
            minimum: MIN_SUPPORTED_APP_VERSION.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(version: &str) -> DatasetHeader {
        DatasetHeader {
            app_version: version.to_string(),
            schema_version: schema::SCHEMA_VERSION.to_string(),
            created_at: "2024-01-01T00:00:00.000Z".to_string(),
        }
    }

    #[test]
    fn current_version_is_supported() {
        assert!(ensure_supported(&header(env!("CARGO_PKG_VERSION"))).is_ok());
    }

    #[test]
    fn prehistoric_version_is_rejected() {
        let err = ensure_supported(&header("0.0.1")).unwrap_err();
        assert!(matches!(err, ImportError::UnsupportedVersion { .. }));
    }

    #[test]
    fn garbage_version_is_rejected() {
        let err = ensure_supported(&header("not-a-version")).unwrap_err();
        assert!(matches!(err, ImportError::InvalidHeader { .. }));
    }
}
