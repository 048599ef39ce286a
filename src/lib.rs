//! Data engine of a personal-finance tracker: the cross-table
//! backup/restore machinery over a 23-table relational store, the
//! legacy-edition migration path, and the change-notification multiplexer
//! between the store and materialized query results.

pub mod db;
pub mod export;
pub mod id;
pub mod import;
pub mod legacy;
pub mod logging;
pub mod model;
pub mod notify;
pub mod prefs;
pub mod schema;
pub mod store;
pub mod tables;
pub mod time;
pub mod vault;

pub use export::{export_dataset, BundleSink, DatasetHeader, ExportError, ExportSink};
pub use import::{
    import_dataset, BundleSource, ImportError, ImportOutcome, ImportSession, ImportSource,
};
pub use legacy::{migrate_legacy, LegacyPaths, MigrationError, MigrationReport};
pub use notify::{ChangeBus, ChangeObserver, NotificationKey, WatchedRows};
pub use prefs::PrefsHandle;
pub use store::{Store, StoreError};
pub use tables::{TableDescriptor, REGISTRY};
pub use vault::{Vault, VaultError};
