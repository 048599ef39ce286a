use uuid::Uuid;

/// Mint a new external identifier.
///
/// External ids are the portable half of a record's identity: they survive
/// export/import while the local rowid does not. Hyphenated lowercase form,
/// matching what the rest of the dataset stores and compares.
pub fn new_uuid() -> String {
    Uuid::new_v4().hyphenated().to_string()
}

/// Quick shape check used when reading untrusted streams.
pub fn is_uuid(value: &str) -> bool {
    Uuid::parse_str(value).is_ok()
}
