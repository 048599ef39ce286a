#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use serde_json::json;
use sqlx::sqlite::SqlitePoolOptions;
use walletbook::id::new_uuid;
use walletbook::model::{self, *};
use walletbook::time::now_ms;
use walletbook::{schema, Store};

pub async fn temp_store() -> Store {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("connect sqlite::memory:");
    sqlx::query("PRAGMA foreign_keys=ON;")
        .execute(&pool)
        .await
        .unwrap();
    schema::apply_baseline(&pool).await.unwrap();
    Store::new(pool)
}

/// External identifiers of a few seeded rows, kept so tests can follow
/// relationships across stores whose local ids differ.
pub struct SeedHandles {
    pub wallet_uuid: String,
    pub grocery_category_uuid: String,
    pub transaction_uuid: String,
    pub tombstoned_transaction_uuid: String,
    pub attachment_uuid: String,
    pub transfer_uuid: String,
}

/// Populate a store with a representative graph touching every table kind:
/// currencies, wallets, a category tree, events/places/people with their
/// links, a debt, a budget, a saving, recurrences, transactions (one
/// tombstoned), a transfer composed of mirrored transactions, templates and
/// attachments.
pub async fn seed_full_store(store: &Store) -> SeedHandles {
    let now = now_ms();

    for (iso, name, symbol) in [("EUR", "Euro", "€"), ("USD", "US Dollar", "$")] {
        let currency = Currency {
            uuid: new_uuid(),
            iso: iso.into(),
            name: name.into(),
            symbol: Some(symbol.into()),
            decimals: 2,
            favourite: (iso == "EUR") as i64,
            tag: None,
            last_edit: now,
            deleted: 0,
        };
        store
            .insert_or_replace("currencies", &model::to_row(&currency))
            .await
            .unwrap();
    }

    let wallet = Wallet {
        uuid: new_uuid(),
        name: "Cash".into(),
        icon: Some("wallet".into()),
        currency: "EUR".into(),
        start_money: 50_000,
        count_in_total: 1,
        archived: 0,
        placement: 0,
        tag: None,
        last_edit: now,
        deleted: 0,
    };
    let wallet_id = store
        .insert_or_replace("wallets", &model::to_row(&wallet))
        .await
        .unwrap();

    let other_wallet = Wallet {
        uuid: new_uuid(),
        name: "Savings account".into(),
        icon: None,
        currency: "EUR".into(),
        start_money: 200_000,
        count_in_total: 1,
        archived: 0,
        placement: 1,
        tag: None,
        last_edit: now,
        deleted: 0,
    };
    let other_wallet_id = store
        .insert_or_replace("wallets", &model::to_row(&other_wallet))
        .await
        .unwrap();

    let essentials = Category {
        uuid: new_uuid(),
        name: "Essentials".into(),
        icon: None,
        kind: CATEGORY_TYPE_EXPENSE,
        parent: None,
        show_report: 1,
        tag: None,
        last_edit: now,
        deleted: 0,
    };
    let essentials_id = store
        .insert_or_replace("categories", &model::to_row(&essentials))
        .await
        .unwrap();

    let groceries = Category {
        uuid: new_uuid(),
        name: "Groceries".into(),
        icon: Some("cart".into()),
        kind: CATEGORY_TYPE_EXPENSE,
        parent: Some(essentials_id),
        show_report: 1,
        tag: None,
        last_edit: now,
        deleted: 0,
    };
    let groceries_id = store
        .insert_or_replace("categories", &model::to_row(&groceries))
        .await
        .unwrap();

    let transfer_category = Category {
        uuid: new_uuid(),
        name: "Transfer".into(),
        icon: None,
        kind: CATEGORY_TYPE_SYSTEM,
        parent: None,
        show_report: 0,
        tag: Some(TAG_TRANSFER.into()),
        last_edit: now,
        deleted: 0,
    };
    let transfer_category_id = store
        .insert_or_replace("categories", &model::to_row(&transfer_category))
        .await
        .unwrap();

    let event = Event {
        uuid: new_uuid(),
        name: "Holiday".into(),
        icon: None,
        note: None,
        start_date: Some(now - 86_400_000),
        end_date: Some(now),
        tag: None,
        last_edit: now,
        deleted: 0,
    };
    let event_id = store
        .insert_or_replace("events", &model::to_row(&event))
        .await
        .unwrap();

    let place = Place {
        uuid: new_uuid(),
        name: "Market".into(),
        icon: None,
        address: Some("1 Market Square".into()),
        latitude: Some(53.35),
        longitude: Some(-6.26),
        tag: None,
        last_edit: now,
        deleted: 0,
    };
    let place_id = store
        .insert_or_replace("places", &model::to_row(&place))
        .await
        .unwrap();

    let person = Person {
        uuid: new_uuid(),
        name: "Ada".into(),
        icon: None,
        note: None,
        tag: None,
        last_edit: now,
        deleted: 0,
    };
    let person_id = store
        .insert_or_replace("people", &model::to_row(&person))
        .await
        .unwrap();

    store
        .insert_or_replace(
            "event_people",
            &model::to_row(&EventPerson {
                uuid: new_uuid(),
                event: event_id,
                person: person_id,
                tag: None,
                last_edit: now,
                deleted: 0,
            }),
        )
        .await
        .unwrap();

    let debt = Debt {
        uuid: new_uuid(),
        kind: DEBT_TYPE_DEBT,
        icon: None,
        description: Some("Car loan".into()),
        date: now - 10 * 86_400_000,
        expiration_date: None,
        wallet: wallet_id,
        note: None,
        place: Some(place_id),
        money: 120_000,
        archived: 0,
        tag: None,
        last_edit: now,
        deleted: 0,
    };
    let debt_id = store
        .insert_or_replace("debts", &model::to_row(&debt))
        .await
        .unwrap();

    store
        .insert_or_replace(
            "debt_people",
            &model::to_row(&DebtPerson {
                uuid: new_uuid(),
                debt: debt_id,
                person: person_id,
                tag: None,
                last_edit: now,
                deleted: 0,
            }),
        )
        .await
        .unwrap();

    let budget = Budget {
        uuid: new_uuid(),
        kind: 0,
        category: Some(groceries_id),
        start_date: now - 30 * 86_400_000,
        end_date: now,
        money: 40_000,
        currency: "EUR".into(),
        tag: None,
        last_edit: now,
        deleted: 0,
    };
    let budget_id = store
        .insert_or_replace("budgets", &model::to_row(&budget))
        .await
        .unwrap();

    store
        .insert_or_replace(
            "budget_wallets",
            &model::to_row(&BudgetWallet {
                uuid: new_uuid(),
                budget: budget_id,
                wallet: wallet_id,
                tag: None,
                last_edit: now,
                deleted: 0,
            }),
        )
        .await
        .unwrap();

    let saving = Saving {
        uuid: new_uuid(),
        description: Some("New bicycle".into()),
        icon: None,
        start_money: 0,
        end_money: 80_000,
        wallet: other_wallet_id,
        end_date: None,
        complete: 0,
        note: None,
        tag: None,
        last_edit: now,
        deleted: 0,
    };
    let saving_id = store
        .insert_or_replace("savings", &model::to_row(&saving))
        .await
        .unwrap();

    let recurrence = RecurrentTransaction {
        uuid: new_uuid(),
        money: 1_200,
        description: Some("Coffee subscription".into()),
        category: groceries_id,
        direction: DIRECTION_EXPENSE,
        wallet: wallet_id,
        place: None,
        note: None,
        event: None,
        confirmed: 1,
        count_in_total: 1,
        start_date: now - 60 * 86_400_000,
        last_occurrence: Some(now - 86_400_000),
        next_occurrence: Some(now + 86_400_000),
        rule: "FREQ=MONTHLY".into(),
        tag: None,
        last_edit: now,
        deleted: 0,
    };
    let recurrence_id = store
        .insert_or_replace("recurrent_transactions", &model::to_row(&recurrence))
        .await
        .unwrap();

    store
        .insert_or_replace(
            "recurrent_transfers",
            &model::to_row(&RecurrentTransfer {
                uuid: new_uuid(),
                description: Some("Monthly savings".into()),
                wallet_from: wallet_id,
                wallet_to: other_wallet_id,
                money: 20_000,
                tax: 0,
                place: None,
                note: None,
                event: None,
                confirmed: 1,
                count_in_total: 1,
                start_date: now - 60 * 86_400_000,
                last_occurrence: None,
                next_occurrence: Some(now + 86_400_000),
                rule: "FREQ=MONTHLY".into(),
                tag: None,
                last_edit: now,
                deleted: 0,
            }),
        )
        .await
        .unwrap();

    let transaction = Transaction {
        uuid: new_uuid(),
        money: 4_550,
        date: now - 3_600_000,
        description: Some("Weekly shop".into()),
        category: groceries_id,
        direction: DIRECTION_EXPENSE,
        kind: 0,
        wallet: wallet_id,
        place: Some(place_id),
        note: None,
        saving: Some(saving_id),
        debt: Some(debt_id),
        event: Some(event_id),
        recurrence: Some(recurrence_id),
        confirmed: 1,
        count_in_total: 1,
        tag: None,
        last_edit: now,
        deleted: 0,
    };
    let transaction_id = store
        .insert_or_replace("transactions", &model::to_row(&transaction))
        .await
        .unwrap();

    let tombstoned = Transaction {
        uuid: new_uuid(),
        money: 999,
        date: now - 7_200_000,
        description: Some("Deleted by user".into()),
        category: groceries_id,
        direction: DIRECTION_EXPENSE,
        kind: 0,
        wallet: wallet_id,
        place: None,
        note: None,
        saving: None,
        debt: None,
        event: None,
        recurrence: None,
        confirmed: 1,
        count_in_total: 1,
        tag: None,
        last_edit: now,
        deleted: 1,
    };
    store
        .insert_or_replace("transactions", &model::to_row(&tombstoned))
        .await
        .unwrap();

    store
        .insert_or_replace(
            "transaction_people",
            &model::to_row(&TransactionPerson {
                uuid: new_uuid(),
                transaction: transaction_id,
                person: person_id,
                tag: None,
                last_edit: now,
                deleted: 0,
            }),
        )
        .await
        .unwrap();

    store
        .insert_or_replace(
            "transaction_models",
            &model::to_row(&TransactionModel {
                uuid: new_uuid(),
                money: 4_550,
                description: Some("Usual shop".into()),
                category: groceries_id,
                direction: DIRECTION_EXPENSE,
                wallet: wallet_id,
                place: None,
                note: None,
                event: None,
                confirmed: 1,
                count_in_total: 1,
                tag: None,
                last_edit: now,
                deleted: 0,
            }),
        )
        .await
        .unwrap();

    // A transfer materialized as mirrored outgoing/incoming transactions.
    let outgoing = Transaction {
        uuid: new_uuid(),
        money: 20_000,
        date: now - 1_800_000,
        description: Some("To savings".into()),
        category: transfer_category_id,
        direction: DIRECTION_EXPENSE,
        kind: 1,
        wallet: wallet_id,
        place: None,
        note: None,
        saving: None,
        debt: None,
        event: None,
        recurrence: None,
        confirmed: 1,
        count_in_total: 0,
        tag: None,
        last_edit: now,
        deleted: 0,
    };
    let outgoing_id = store
        .insert_or_replace("transactions", &model::to_row(&outgoing))
        .await
        .unwrap();
    let incoming = Transaction {
        uuid: new_uuid(),
        money: 20_000,
        date: now - 1_800_000,
        description: Some("From cash".into()),
        category: transfer_category_id,
        direction: DIRECTION_INCOME,
        kind: 1,
        wallet: other_wallet_id,
        place: None,
        note: None,
        saving: None,
        debt: None,
        event: None,
        recurrence: None,
        confirmed: 1,
        count_in_total: 0,
        tag: None,
        last_edit: now,
        deleted: 0,
    };
    let incoming_id = store
        .insert_or_replace("transactions", &model::to_row(&incoming))
        .await
        .unwrap();

    let transfer = Transfer {
        uuid: new_uuid(),
        description: Some("Monthly savings".into()),
        date: now - 1_800_000,
        transaction_from: outgoing_id,
        transaction_to: incoming_id,
        transaction_tax: None,
        note: None,
        place: None,
        event: None,
        recurrence: None,
        tag: None,
        last_edit: now,
        deleted: 0,
    };
    let transfer_id = store
        .insert_or_replace("transfers", &model::to_row(&transfer))
        .await
        .unwrap();

    store
        .insert_or_replace(
            "transfer_people",
            &model::to_row(&TransferPerson {
                uuid: new_uuid(),
                transfer: transfer_id,
                person: person_id,
                tag: None,
                last_edit: now,
                deleted: 0,
            }),
        )
        .await
        .unwrap();

    store
        .insert_or_replace(
            "transfer_models",
            &model::to_row(&TransferModel {
                uuid: new_uuid(),
                description: Some("Savings template".into()),
                wallet_from: wallet_id,
                wallet_to: other_wallet_id,
                money: 20_000,
                tax: 0,
                place: None,
                note: None,
                event: None,
                confirmed: 1,
                count_in_total: 0,
                tag: None,
                last_edit: now,
                deleted: 0,
            }),
        )
        .await
        .unwrap();

    let attachment = Attachment {
        uuid: new_uuid(),
        file: "receipt.jpg".into(),
        media_type: Some("image/jpeg".into()),
        size: 2_048,
        note: None,
        tag: None,
        last_edit: now,
        deleted: 0,
    };
    let attachment_id = store
        .insert_or_replace("attachments", &model::to_row(&attachment))
        .await
        .unwrap();

    store
        .insert_or_replace(
            "transaction_attachments",
            &model::to_row(&TransactionAttachment {
                uuid: new_uuid(),
                transaction: transaction_id,
                attachment: attachment_id,
                tag: None,
                last_edit: now,
                deleted: 0,
            }),
        )
        .await
        .unwrap();

    store
        .insert_or_replace(
            "transfer_attachments",
            &model::to_row(&TransferAttachment {
                uuid: new_uuid(),
                transfer: transfer_id,
                attachment: attachment_id,
                tag: None,
                last_edit: now,
                deleted: 0,
            }),
        )
        .await
        .unwrap();

    SeedHandles {
        wallet_uuid: wallet.uuid,
        grocery_category_uuid: groceries.uuid,
        transaction_uuid: transaction.uuid,
        tombstoned_transaction_uuid: tombstoned.uuid,
        attachment_uuid: attachment.uuid,
        transfer_uuid: transfer.uuid,
    }
}

/// Count rows of a table directly.
pub async fn count_rows(store: &Store, table: &str) -> i64 {
    let sql = format!("SELECT COUNT(*) FROM \"{table}\"");
    sqlx::query_scalar(&sql)
        .fetch_one(store.pool())
        .await
        .unwrap()
}

/// Fetch one row by uuid as JSON, panicking if absent.
pub async fn row_by_uuid(store: &Store, table: &str, uuid: &str) -> serde_json::Value {
    let rows = store
        .query_where(table, "uuid", &json!(uuid))
        .await
        .unwrap();
    rows.into_iter().next().expect("row exists")
}
