use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Typed row shapes for the dataset tables.
///
/// Flags and tombstones are kept as `i64` (0/1) and money amounts as `i64`
/// minor units, matching the column affinities of the store one-for-one so
/// a serialized struct is a valid row payload for the gateway. Foreign-key
/// fields hold local rowids; only the export/import layer ever sees them as
/// external uuids. The local `id` column never appears here: it is assigned
/// by the store and read back from insert results.

pub const CATEGORY_TYPE_INCOME: i64 = 0;
pub const CATEGORY_TYPE_EXPENSE: i64 = 1;
pub const CATEGORY_TYPE_SYSTEM: i64 = 2;

pub const DIRECTION_INCOME: i64 = 0;
pub const DIRECTION_EXPENSE: i64 = 1;

pub const DEBT_TYPE_DEBT: i64 = 0;
pub const DEBT_TYPE_CREDIT: i64 = 1;

/// Tags marking system-generated categories that back transfers, taxes and
/// debts. They must never collide with user categories of the same role.
pub const TAG_TRANSFER: &str = "system::transfer";
pub const TAG_TRANSFER_TAX: &str = "system::transfer_tax";
pub const TAG_DEBT: &str = "system::debt";
pub const TAG_CREDIT: &str = "system::credit";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Currency {
    pub uuid: String,
    pub iso: String,
    pub name: String,
    pub symbol: Option<String>,
    pub decimals: i64,
    pub favourite: i64,
    pub tag: Option<String>,
    pub last_edit: i64,
    pub deleted: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wallet {
    pub uuid: String,
    pub name: String,
    pub icon: Option<String>,
    /// ISO code of the wallet currency; a portable natural key, so it is
    /// carried through export/import unchanged.
    pub currency: String,
    pub start_money: i64,
    pub count_in_total: i64,
    pub archived: i64,
    pub placement: i64,
    pub tag: Option<String>,
    pub last_edit: i64,
    pub deleted: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub uuid: String,
    pub name: String,
    pub icon: Option<String>,
    #[serde(rename = "type")]
    pub kind: i64,
    /// Local rowid of the parent category, if any. The one self-reference
    /// of the dataset; import resolves it in dependency passes.
    pub parent: Option<i64>,
    pub show_report: i64,
    pub tag: Option<String>,
    pub last_edit: i64,
    pub deleted: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub uuid: String,
    pub name: String,
    pub icon: Option<String>,
    pub note: Option<String>,
    pub start_date: Option<i64>,
    pub end_date: Option<i64>,
    pub tag: Option<String>,
    pub last_edit: i64,
    pub deleted: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Place {
    pub uuid: String,
    pub name: String,
    pub icon: Option<String>,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub tag: Option<String>,
    pub last_edit: i64,
    pub deleted: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Person {
    pub uuid: String,
    pub name: String,
    pub icon: Option<String>,
    pub note: Option<String>,
    pub tag: Option<String>,
    pub last_edit: i64,
    pub deleted: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventPerson {
    pub uuid: String,
    pub event: i64,
    pub person: i64,
    pub tag: Option<String>,
    pub last_edit: i64,
    pub deleted: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Debt {
    pub uuid: String,
    #[serde(rename = "type")]
    pub kind: i64,
    pub icon: Option<String>,
    pub description: Option<String>,
    pub date: i64,
    pub expiration_date: Option<i64>,
    pub wallet: i64,
    pub note: Option<String>,
    pub place: Option<i64>,
    pub money: i64,
    pub archived: i64,
    pub tag: Option<String>,
    pub last_edit: i64,
    pub deleted: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebtPerson {
    pub uuid: String,
    pub debt: i64,
    pub person: i64,
    pub tag: Option<String>,
    pub last_edit: i64,
    pub deleted: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Budget {
    pub uuid: String,
    #[serde(rename = "type")]
    pub kind: i64,
    pub category: Option<i64>,
    pub start_date: i64,
    pub end_date: i64,
    pub money: i64,
    pub currency: String,
    pub tag: Option<String>,
    pub last_edit: i64,
    pub deleted: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetWallet {
    pub uuid: String,
    pub budget: i64,
    pub wallet: i64,
    pub tag: Option<String>,
    pub last_edit: i64,
    pub deleted: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Saving {
    pub uuid: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub start_money: i64,
    pub end_money: i64,
    pub wallet: i64,
    pub end_date: Option<i64>,
    pub complete: i64,
    pub note: Option<String>,
    pub tag: Option<String>,
    pub last_edit: i64,
    pub deleted: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurrentTransaction {
    pub uuid: String,
    pub money: i64,
    pub description: Option<String>,
    pub category: i64,
    pub direction: i64,
    pub wallet: i64,
    pub place: Option<i64>,
    pub note: Option<String>,
    pub event: Option<i64>,
    pub confirmed: i64,
    pub count_in_total: i64,
    pub start_date: i64,
    pub last_occurrence: Option<i64>,
    pub next_occurrence: Option<i64>,
    /// Serialized recurrence rule, opaque to this engine.
    pub rule: String,
    pub tag: Option<String>,
    pub last_edit: i64,
    pub deleted: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurrentTransfer {
    pub uuid: String,
    pub description: Option<String>,
    pub wallet_from: i64,
    pub wallet_to: i64,
    pub money: i64,
    pub tax: i64,
    pub place: Option<i64>,
    pub note: Option<String>,
    pub event: Option<i64>,
    pub confirmed: i64,
    pub count_in_total: i64,
    pub start_date: i64,
    pub last_occurrence: Option<i64>,
    pub next_occurrence: Option<i64>,
    pub rule: String,
    pub tag: Option<String>,
    pub last_edit: i64,
    pub deleted: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub uuid: String,
    pub money: i64,
    pub date: i64,
    pub description: Option<String>,
    pub category: i64,
    pub direction: i64,
    #[serde(rename = "type")]
    pub kind: i64,
    pub wallet: i64,
    pub place: Option<i64>,
    pub note: Option<String>,
    pub saving: Option<i64>,
    pub debt: Option<i64>,
    pub event: Option<i64>,
    pub recurrence: Option<i64>,
    pub confirmed: i64,
    pub count_in_total: i64,
    pub tag: Option<String>,
    pub last_edit: i64,
    pub deleted: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionPerson {
    pub uuid: String,
    pub transaction: i64,
    pub person: i64,
    pub tag: Option<String>,
    pub last_edit: i64,
    pub deleted: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionModel {
    pub uuid: String,
    pub money: i64,
    pub description: Option<String>,
    pub category: i64,
    pub direction: i64,
    pub wallet: i64,
    pub place: Option<i64>,
    pub note: Option<String>,
    pub event: Option<i64>,
    pub confirmed: i64,
    pub count_in_total: i64,
    pub tag: Option<String>,
    pub last_edit: i64,
    pub deleted: i64,
}

/// A transfer is materialized as two mirrored transactions (plus an
/// optional tax transaction) and this row tying them together.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transfer {
    pub uuid: String,
    pub description: Option<String>,
    pub date: i64,
    pub transaction_from: i64,
    pub transaction_to: i64,
    pub transaction_tax: Option<i64>,
    pub note: Option<String>,
    pub place: Option<i64>,
    pub event: Option<i64>,
    pub recurrence: Option<i64>,
    pub tag: Option<String>,
    pub last_edit: i64,
    pub deleted: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferPerson {
    pub uuid: String,
    pub transfer: i64,
    pub person: i64,
    pub tag: Option<String>,
    pub last_edit: i64,
    pub deleted: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferModel {
    pub uuid: String,
    pub description: Option<String>,
    pub wallet_from: i64,
    pub wallet_to: i64,
    pub money: i64,
    pub tax: i64,
    pub place: Option<i64>,
    pub note: Option<String>,
    pub event: Option<i64>,
    pub confirmed: i64,
    pub count_in_total: i64,
    pub tag: Option<String>,
    pub last_edit: i64,
    pub deleted: i64,
}

/// Attachment row metadata. The bytes live outside the store, addressed by
/// the row's `uuid` in the vault layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub uuid: String,
    pub file: String,
    #[serde(rename = "type")]
    pub media_type: Option<String>,
    pub size: i64,
    pub note: Option<String>,
    pub tag: Option<String>,
    pub last_edit: i64,
    pub deleted: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionAttachment {
    pub uuid: String,
    pub transaction: i64,
    pub attachment: i64,
    pub tag: Option<String>,
    pub last_edit: i64,
    pub deleted: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferAttachment {
    pub uuid: String,
    pub transfer: i64,
    pub attachment: i64,
    pub tag: Option<String>,
    pub last_edit: i64,
    pub deleted: i64,
}

/// Serialize a typed record into the row payload shape the gateway binds.
pub fn to_row<T: Serialize>(record: &T) -> Map<String, Value> {
    match serde_json::to_value(record) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}
