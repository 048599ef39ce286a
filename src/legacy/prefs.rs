use std::fs;
use std::path::Path;

use serde_json::Value;
use tracing::{info, warn};

use super::MigrationError;
use crate::prefs::{ColorScheme, CurrencyDisplay, GroupMode, PrefsHandle};

/// Date patterns the legacy edition addressed by index.
const LEGACY_DATE_FORMATS: &[&str] = &[
    "MM/dd/yyyy",
    "dd/MM/yyyy",
    "yyyy-MM-dd",
    "dd-MM-yyyy",
    "MM-dd-yyyy",
    "dd.MM.yyyy",
];

/// Carry the legacy preference values into the current store.
///
/// The legacy store is read exactly once, deleted, and only then are the
/// mapped values written out. A legacy store that never existed is not an
/// error; one that exists but cannot be read or removed is.
pub fn migrate_preferences(
    legacy_path: &Path,
    prefs: &PrefsHandle,
) -> Result<(), MigrationError> {
    if !legacy_path.exists() {
        warn!(
            target: "walletbook",
            event = "legacy_preferences_missing",
            path = %legacy_path.display()
        );
        return Ok(());
    }

    let payload = fs::read(legacy_path).map_err(|err| MigrationError::Io {
        path: legacy_path.display().to_string(),
        source: err,
    })?;
    let legacy: Value = serde_json::from_slice(&payload)
        .map_err(|err| MigrationError::Preferences(err.into()))?;

    fs::remove_file(legacy_path).map_err(|err| MigrationError::Io {
        path: legacy_path.display().to_string(),
        source: err,
    })?;

    apply(&legacy, prefs);
    prefs.save().map_err(MigrationError::Preferences)?;

    info!(
        target: "walletbook",
        event = "legacy_preferences_migrated",
        path = %legacy_path.display()
    );
    Ok(())
}

fn apply(legacy: &Value, prefs: &PrefsHandle) {
    if let Some(index) = legacy.get("dateFormatIndex").and_then(Value::as_i64) {
        let pattern = LEGACY_DATE_FORMATS
            .get(index.max(0) as usize)
            .copied()
            .unwrap_or(crate::prefs::DEFAULT_DATE_FORMAT);
        prefs.set_date_format(pattern);
    }

    if let Some(dark) = legacy.get("darkTheme").and_then(Value::as_bool) {
        prefs.set_color_scheme(if dark {
            ColorScheme::Dark
        } else {
            ColorScheme::Light
        });
    }

    if let Some(group) = legacy.get("groupType").and_then(Value::as_i64) {
        prefs.set_group_mode(match group {
            0 => GroupMode::Day,
            1 => GroupMode::Week,
            3 => GroupMode::Year,
            _ => GroupMode::Month,
        });
    }

    if let Some(day) = legacy.get("firstDayOfWeek").and_then(Value::as_i64) {
        prefs.set_week_start_day(day.clamp(1, 7) as u8);
    }
    if let Some(day) = legacy.get("firstDayOfMonth").and_then(Value::as_i64) {
        prefs.set_month_start_day(day.clamp(1, 28) as u8);
    }

    if let Some(enabled) = legacy.get("reminderEnabled").and_then(Value::as_bool) {
        prefs.set_reminder_enabled(enabled);
    }
    if let Some(hour) = legacy.get("reminderHour").and_then(Value::as_i64) {
        prefs.set_reminder_hour(hour.clamp(0, 23) as u8);
    }

    if let Some(show) = legacy.get("showCurrencySymbol").and_then(Value::as_bool) {
        prefs.set_currency_display(if show {
            CurrencyDisplay::Symbol
        } else {
            CurrencyDisplay::Iso
        });
    }

    if let Some(grouping) = legacy.get("groupDigits").and_then(Value::as_bool) {
        prefs.set_digit_grouping(grouping);
    }
    if let Some(rounding) = legacy.get("roundDecimals").and_then(Value::as_bool) {
        prefs.set_rounding(rounding);
    }
}
