use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::PathBuf;

use thiserror::Error;
use tracing::{info, warn};

use crate::import::{self, ImportError, ImportSession};
use crate::prefs::PrefsHandle;
use crate::store::Store;
use crate::vault::{Vault, VaultError};

pub mod database;
pub mod prefs;

pub use database::LegacyDatabase;

const SKIP_REASON_UNMATCHED: &str = "unmatched";
const SKIP_REASON_MISSING_SOURCE: &str = "missing_source";

/// On-disk locations of the legacy edition's state.
#[derive(Debug, Clone)]
pub struct LegacyPaths {
    /// The obsolete database file.
    pub database: PathBuf,
    /// Flat folder of attachment files keyed by their original names.
    pub attachments: PathBuf,
    /// The legacy preference store.
    pub preferences: PathBuf,
}

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("legacy import failed: {0}")]
    Import(#[from] ImportError),
    #[error("failed to open legacy store {path}: {source}")]
    LegacyOpen {
        path: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("legacy schema mismatch: {detail}")]
    LegacySchema { detail: String },
    #[error("migration I/O failure at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to relocate attachment {path}: {source}")]
    AttachmentMove {
        path: String,
        #[source]
        source: VaultError,
    },
    #[error("failed to migrate preferences: {0}")]
    Preferences(#[source] anyhow::Error),
}

#[derive(Debug, Clone, Default)]
pub struct MigrationReport {
    pub tables: BTreeMap<String, u64>,
    pub attachments_moved: u64,
    pub attachments_skipped: u64,
    pub skipped_reasons: BTreeMap<String, u64>,
}

impl MigrationReport {
    fn record_skip(&mut self, reason: &str) {
        self.attachments_skipped += 1;
        *self.skipped_reasons.entry(reason.to_string()).or_insert(0) += 1;
    }
}

/// Migrate a legacy edition into the current store, in three steps:
///
/// (a) feed every legacy table through the ordered import session inside
///     one destination transaction, then close the legacy handle and delete
///     its file (closing releases the lock deletion needs);
/// (b) relocate the flat attachment folder into the vault layout, renaming
///     each matched file to the external id its row received;
/// (c) carry the legacy preference values over and destroy their store.
///
/// A failure in (a) aborts everything. During (b), a missing source file is
/// a logged skip; failing to move a matched file, or to create the vault
/// directory for it, aborts the rest of the migration.
pub async fn migrate_legacy(
    paths: &LegacyPaths,
    store: &Store,
    vault: &Vault,
    prefs: &PrefsHandle,
) -> Result<MigrationReport, MigrationError> {
    info!(
        target: "walletbook",
        event = "legacy_migration_started",
        database = %paths.database.display()
    );

    let mut source = LegacyDatabase::open(&paths.database).await?;
    let outcome = import::import_dataset(store, &mut source).await?;
    source.close_and_delete().await?;
    info!(
        target: "walletbook",
        event = "legacy_store_removed",
        rows = outcome.tables.values().sum::<u64>()
    );

    let mut report = MigrationReport {
        tables: outcome.tables.clone(),
        ..Default::default()
    };
    relocate_attachments(&outcome.session, paths, vault, &mut report)?;
    prefs::migrate_preferences(&paths.preferences, prefs)?;

    info!(
        target: "walletbook",
        event = "legacy_migration_complete",
        attachments_moved = report.attachments_moved,
        attachments_skipped = report.attachments_skipped
    );
    Ok(report)
}

fn relocate_attachments(
    session: &ImportSession,
    paths: &LegacyPaths,
    vault: &Vault,
    report: &mut MigrationReport,
) -> Result<(), MigrationError> {
    let legacy_dir = &paths.attachments;
    if !legacy_dir.exists() {
        warn!(
            target: "walletbook",
            event = "legacy_attachments_missing",
            path = %legacy_dir.display()
        );
        return Ok(());
    }

    let mut moved: HashSet<String> = HashSet::new();
    let entries = fs::read_dir(legacy_dir).map_err(|err| MigrationError::Io {
        path: legacy_dir.display().to_string(),
        source: err,
    })?;
    for entry in entries {
        let entry = entry.map_err(|err| MigrationError::Io {
            path: legacy_dir.display().to_string(),
            source: err,
        })?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        match session.attachment_id_for(&name) {
            Some(uuid) => {
                vault
                    .import_file(&path, uuid)
                    .map_err(|err| MigrationError::AttachmentMove {
                        path: path.display().to_string(),
                        source: err,
                    })?;
                moved.insert(name);
                report.attachments_moved += 1;
            }
            None => {
                report.record_skip(SKIP_REASON_UNMATCHED);
            }
        }
    }

    // Rows imported without a file on disk: orphaned metadata. Reported,
    // never fatal.
    for (name, uuid) in session.attachment_names() {
        if !moved.contains(name) {
            warn!(
                target: "walletbook",
                event = "legacy_attachment_source_missing",
                name,
                uuid
            );
            report.record_skip(SKIP_REASON_MISSING_SOURCE);
        }
    }

    fs::remove_dir_all(legacy_dir).map_err(|err| MigrationError::Io {
        path: legacy_dir.display().to_string(),
        source: err,
    })?;
    Ok(())
}
