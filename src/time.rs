use chrono::Utc;

/// Epoch milliseconds, the timestamp unit every `last_edit` column uses.
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}
