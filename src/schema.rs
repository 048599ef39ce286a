use sqlx::SqlitePool;

/// Version stamp recorded in export headers. Bumped with any DDL change.
pub const SCHEMA_VERSION: &str = "baseline-0001";

/// Baseline DDL for a fresh store.
///
/// Every table carries the common identity quartet: a store-private rowid
/// (`id`), the portable external identifier (`uuid`), the last-modified
/// timestamp (`last_edit`) and the soft-delete tombstone (`deleted`), plus
/// the free-form `tag` marker for system-generated rows. Foreign keys
/// reference local rowids except currency references, which use the ISO
/// code natural key.
const BASELINE: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS currencies (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        uuid TEXT NOT NULL UNIQUE,
        iso TEXT NOT NULL UNIQUE,
        name TEXT NOT NULL,
        symbol TEXT,
        decimals INTEGER NOT NULL DEFAULT 2,
        favourite INTEGER NOT NULL DEFAULT 0,
        tag TEXT,
        last_edit INTEGER NOT NULL,
        deleted INTEGER NOT NULL DEFAULT 0
    )",
    "CREATE TABLE IF NOT EXISTS wallets (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        uuid TEXT NOT NULL UNIQUE,
        name TEXT NOT NULL,
        icon TEXT,
        currency TEXT NOT NULL REFERENCES currencies(iso),
        start_money INTEGER NOT NULL DEFAULT 0,
        count_in_total INTEGER NOT NULL DEFAULT 1,
        archived INTEGER NOT NULL DEFAULT 0,
        placement INTEGER NOT NULL DEFAULT 0,
        tag TEXT,
        last_edit INTEGER NOT NULL,
        deleted INTEGER NOT NULL DEFAULT 0
    )",
    "CREATE TABLE IF NOT EXISTS categories (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        uuid TEXT NOT NULL UNIQUE,
        name TEXT NOT NULL,
        icon TEXT,
        \"type\" INTEGER NOT NULL,
        parent INTEGER REFERENCES categories(id),
        show_report INTEGER NOT NULL DEFAULT 1,
        tag TEXT,
        last_edit INTEGER NOT NULL,
        deleted INTEGER NOT NULL DEFAULT 0
    )",
    "CREATE TABLE IF NOT EXISTS events (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        uuid TEXT NOT NULL UNIQUE,
        name TEXT NOT NULL,
        icon TEXT,
        note TEXT,
        start_date INTEGER,
        end_date INTEGER,
        tag TEXT,
        last_edit INTEGER NOT NULL,
        deleted INTEGER NOT NULL DEFAULT 0
    )",
    "CREATE TABLE IF NOT EXISTS places (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        uuid TEXT NOT NULL UNIQUE,
        name TEXT NOT NULL,
        icon TEXT,
        address TEXT,
        latitude REAL,
        longitude REAL,
        tag TEXT,
        last_edit INTEGER NOT NULL,
        deleted INTEGER NOT NULL DEFAULT 0
    )",
    "CREATE TABLE IF NOT EXISTS people (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        uuid TEXT NOT NULL UNIQUE,
        name TEXT NOT NULL,
        icon TEXT,
        note TEXT,
        tag TEXT,
        last_edit INTEGER NOT NULL,
        deleted INTEGER NOT NULL DEFAULT 0
    )",
    "CREATE TABLE IF NOT EXISTS event_people (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        uuid TEXT NOT NULL UNIQUE,
        event INTEGER NOT NULL REFERENCES events(id),
        person INTEGER NOT NULL REFERENCES people(id),
        tag TEXT,
        last_edit INTEGER NOT NULL,
        deleted INTEGER NOT NULL DEFAULT 0
    )",
    "CREATE TABLE IF NOT EXISTS debts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        uuid TEXT NOT NULL UNIQUE,
        \"type\" INTEGER NOT NULL,
        icon TEXT,
        description TEXT,
        date INTEGER NOT NULL,
        expiration_date INTEGER,
        wallet INTEGER NOT NULL REFERENCES wallets(id),
        note TEXT,
        place INTEGER REFERENCES places(id),
        money INTEGER NOT NULL DEFAULT 0,
        archived INTEGER NOT NULL DEFAULT 0,
        tag TEXT,
        last_edit INTEGER NOT NULL,
        deleted INTEGER NOT NULL DEFAULT 0
    )",
    "CREATE TABLE IF NOT EXISTS debt_people (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        uuid TEXT NOT NULL UNIQUE,
        debt INTEGER NOT NULL REFERENCES debts(id),
        person INTEGER NOT NULL REFERENCES people(id),
        tag TEXT,
        last_edit INTEGER NOT NULL,
        deleted INTEGER NOT NULL DEFAULT 0
    )",
    "CREATE TABLE IF NOT EXISTS budgets (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        uuid TEXT NOT NULL UNIQUE,
        \"type\" INTEGER NOT NULL,
        category INTEGER REFERENCES categories(id),
        start_date INTEGER NOT NULL,
        end_date INTEGER NOT NULL,
        money INTEGER NOT NULL DEFAULT 0,
        currency TEXT NOT NULL REFERENCES currencies(iso),
        tag TEXT,
        last_edit INTEGER NOT NULL,
        deleted INTEGER NOT NULL DEFAULT 0
    )",
    "CREATE TABLE IF NOT EXISTS budget_wallets (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        uuid TEXT NOT NULL UNIQUE,
        budget INTEGER NOT NULL REFERENCES budgets(id),
        wallet INTEGER NOT NULL REFERENCES wallets(id),
        tag TEXT,
        last_edit INTEGER NOT NULL,
        deleted INTEGER NOT NULL DEFAULT 0
    )",
    "CREATE TABLE IF NOT EXISTS savings (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        uuid TEXT NOT NULL UNIQUE,
        description TEXT,
        icon TEXT,
        start_money INTEGER NOT NULL DEFAULT 0,
        end_money INTEGER NOT NULL,
        wallet INTEGER NOT NULL REFERENCES wallets(id),
        end_date INTEGER,
        complete INTEGER NOT NULL DEFAULT 0,
        note TEXT,
        tag TEXT,
        last_edit INTEGER NOT NULL,
        deleted INTEGER NOT NULL DEFAULT 0
    )",
    "CREATE TABLE IF NOT EXISTS recurrent_transactions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        uuid TEXT NOT NULL UNIQUE,
        money INTEGER NOT NULL,
        description TEXT,
        category INTEGER NOT NULL REFERENCES categories(id),
        direction INTEGER NOT NULL,
        wallet INTEGER NOT NULL REFERENCES wallets(id),
        place INTEGER REFERENCES places(id),
        note TEXT,
        event INTEGER REFERENCES events(id),
        confirmed INTEGER NOT NULL DEFAULT 1,
        count_in_total INTEGER NOT NULL DEFAULT 1,
        start_date INTEGER NOT NULL,
        last_occurrence INTEGER,
        next_occurrence INTEGER,
        rule TEXT NOT NULL,
        tag TEXT,
        last_edit INTEGER NOT NULL,
        deleted INTEGER NOT NULL DEFAULT 0
    )",
    "CREATE TABLE IF NOT EXISTS recurrent_transfers (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        uuid TEXT NOT NULL UNIQUE,
        description TEXT,
        wallet_from INTEGER NOT NULL REFERENCES wallets(id),
        wallet_to INTEGER NOT NULL REFERENCES wallets(id),
        money INTEGER NOT NULL,
        tax INTEGER NOT NULL DEFAULT 0,
        place INTEGER REFERENCES places(id),
        note TEXT,
        event INTEGER REFERENCES events(id),
        confirmed INTEGER NOT NULL DEFAULT 1,
        count_in_total INTEGER NOT NULL DEFAULT 1,
        start_date INTEGER NOT NULL,
        last_occurrence INTEGER,
        next_occurrence INTEGER,
        rule TEXT NOT NULL,
        tag TEXT,
        last_edit INTEGER NOT NULL,
        deleted INTEGER NOT NULL DEFAULT 0
    )",
    "CREATE TABLE IF NOT EXISTS transactions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        uuid TEXT NOT NULL UNIQUE,
        money INTEGER NOT NULL,
        date INTEGER NOT NULL,
        description TEXT,
        category INTEGER NOT NULL REFERENCES categories(id),
        direction INTEGER NOT NULL,
        \"type\" INTEGER NOT NULL DEFAULT 0,
        wallet INTEGER NOT NULL REFERENCES wallets(id),
        place INTEGER REFERENCES places(id),
        note TEXT,
        saving INTEGER REFERENCES savings(id),
        debt INTEGER REFERENCES debts(id),
        event INTEGER REFERENCES events(id),
        recurrence INTEGER REFERENCES recurrent_transactions(id),
        confirmed INTEGER NOT NULL DEFAULT 1,
        count_in_total INTEGER NOT NULL DEFAULT 1,
        tag TEXT,
        last_edit INTEGER NOT NULL,
        deleted INTEGER NOT NULL DEFAULT 0
    )",
    "CREATE TABLE IF NOT EXISTS transaction_people (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        uuid TEXT NOT NULL UNIQUE,
        \"transaction\" INTEGER NOT NULL REFERENCES transactions(id),
        person INTEGER NOT NULL REFERENCES people(id),
        tag TEXT,
        last_edit INTEGER NOT NULL,
        deleted INTEGER NOT NULL DEFAULT 0
    )",
    "CREATE TABLE IF NOT EXISTS transaction_models (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        uuid TEXT NOT NULL UNIQUE,
        money INTEGER NOT NULL,
        description TEXT,
        category INTEGER NOT NULL REFERENCES categories(id),
        direction INTEGER NOT NULL,
        wallet INTEGER NOT NULL REFERENCES wallets(id),
        place INTEGER REFERENCES places(id),
        note TEXT,
        event INTEGER REFERENCES events(id),
        confirmed INTEGER NOT NULL DEFAULT 1,
        count_in_total INTEGER NOT NULL DEFAULT 1,
        tag TEXT,
        last_edit INTEGER NOT NULL,
        deleted INTEGER NOT NULL DEFAULT 0
    )",
    "CREATE TABLE IF NOT EXISTS transfers (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        uuid TEXT NOT NULL UNIQUE,
        description TEXT,
        date INTEGER NOT NULL,
        transaction_from INTEGER NOT NULL REFERENCES transactions(id),
        transaction_to INTEGER NOT NULL REFERENCES transactions(id),
        transaction_tax INTEGER REFERENCES transactions(id),
        note TEXT,
        place INTEGER REFERENCES places(id),
        event INTEGER REFERENCES events(id),
        recurrence INTEGER REFERENCES recurrent_transfers(id),
        tag TEXT,
        last_edit INTEGER NOT NULL,
        deleted INTEGER NOT NULL DEFAULT 0
    )",
    "CREATE TABLE IF NOT EXISTS transfer_people (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        uuid TEXT NOT NULL UNIQUE,
        transfer INTEGER NOT NULL REFERENCES transfers(id),
        person INTEGER NOT NULL REFERENCES people(id),
        tag TEXT,
        last_edit INTEGER NOT NULL,
        deleted INTEGER NOT NULL DEFAULT 0
    )",
    "CREATE TABLE IF NOT EXISTS transfer_models (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        uuid TEXT NOT NULL UNIQUE,
        description TEXT,
        wallet_from INTEGER NOT NULL REFERENCES wallets(id),
        wallet_to INTEGER NOT NULL REFERENCES wallets(id),
        money INTEGER NOT NULL,
        tax INTEGER NOT NULL DEFAULT 0,
        place INTEGER REFERENCES places(id),
        note TEXT,
        event INTEGER REFERENCES events(id),
        confirmed INTEGER NOT NULL DEFAULT 1,
        count_in_total INTEGER NOT NULL DEFAULT 1,
        tag TEXT,
        last_edit INTEGER NOT NULL,
        deleted INTEGER NOT NULL DEFAULT 0
    )",
    "CREATE TABLE IF NOT EXISTS attachments (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        uuid TEXT NOT NULL UNIQUE,
        file TEXT NOT NULL,
        \"type\" TEXT,
        size INTEGER NOT NULL DEFAULT 0,
        note TEXT,
        tag TEXT,
        last_edit INTEGER NOT NULL,
        deleted INTEGER NOT NULL DEFAULT 0
    )",
    "CREATE TABLE IF NOT EXISTS transaction_attachments (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        uuid TEXT NOT NULL UNIQUE,
        \"transaction\" INTEGER NOT NULL REFERENCES transactions(id),
        attachment INTEGER NOT NULL REFERENCES attachments(id),
        tag TEXT,
        last_edit INTEGER NOT NULL,
        deleted INTEGER NOT NULL DEFAULT 0
    )",
    "CREATE TABLE IF NOT EXISTS transfer_attachments (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        uuid TEXT NOT NULL UNIQUE,
        transfer INTEGER NOT NULL REFERENCES transfers(id),
        attachment INTEGER NOT NULL REFERENCES attachments(id),
        tag TEXT,
        last_edit INTEGER NOT NULL,
        deleted INTEGER NOT NULL DEFAULT 0
    )",
];

/// Create the baseline schema on a fresh (or partially initialized) store.
pub async fn apply_baseline(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    for ddl in BASELINE {
        sqlx::query(ddl).execute(pool).await?;
    }
    tracing::info!(
        target: "walletbook",
        event = "schema_baseline_applied",
        tables = BASELINE.len()
    );
    Ok(())
}
