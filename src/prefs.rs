use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

pub const KEY_DATE_FORMAT: &str = "dateFormat";
pub const KEY_COLOR_SCHEME: &str = "colorScheme";
pub const KEY_GROUP_MODE: &str = "groupMode";
pub const KEY_WEEK_START_DAY: &str = "weekStartDay";
pub const KEY_MONTH_START_DAY: &str = "monthStartDay";
pub const KEY_REMINDER_ENABLED: &str = "reminderEnabled";
pub const KEY_REMINDER_HOUR: &str = "reminderHour";
pub const KEY_CURRENCY_DISPLAY: &str = "currencyDisplay";
pub const KEY_DIGIT_GROUPING: &str = "digitGrouping";
pub const KEY_ROUNDING: &str = "rounding";

pub const DEFAULT_DATE_FORMAT: &str = "dd/MM/yyyy";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorScheme {
    Light,
    Dark,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupMode {
    Day,
    Week,
    Month,
    Year,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurrencyDisplay {
    Symbol,
    Iso,
    Hidden,
}

trait PreferenceBackend: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn save(&self) -> anyhow::Result<()>;
}

struct FileBackend {
    path: PathBuf,
    data: Mutex<HashMap<String, String>>,
}

impl FileBackend {
    fn open(path: PathBuf) -> Self {
        let data = std::fs::read(&path)
            .ok()
            .and_then(|bytes| serde_json::from_slice::<HashMap<String, String>>(&bytes).ok())
            .unwrap_or_default();
        Self {
            path,
            data: Mutex::new(data),
        }
    }
}

impl PreferenceBackend for FileBackend {
    fn get(&self, key: &str) -> Option<String> {
        self.data
            .lock()
            .map(|guard| guard.get(key).cloned())
            .unwrap_or_default()
    }

    fn set(&self, key: &str, value: &str) {
        if let Ok(mut guard) = self.data.lock() {
            guard.insert(key.to_string(), value.to_string());
        }
    }

    fn save(&self) -> anyhow::Result<()> {
        let snapshot = self
            .data
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default();
        let payload = serde_json::to_vec_pretty(&snapshot)?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.partial");
        std::fs::write(&tmp, &payload)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[derive(Default)]
struct MemoryBackend {
    data: Mutex<HashMap<String, String>>,
}

impl PreferenceBackend for MemoryBackend {
    fn get(&self, key: &str) -> Option<String> {
        self.data
            .lock()
            .map(|guard| guard.get(key).cloned())
            .unwrap_or_default()
    }

    fn set(&self, key: &str, value: &str) {
        if let Ok(mut guard) = self.data.lock() {
            guard.insert(key.to_string(), value.to_string());
        }
    }

    fn save(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Typed handle over the current preference store.
///
/// Getters fall back to defaults for unset or unparsable values; nothing in
/// here treats a missing key as an error.
#[derive(Clone)]
pub struct PrefsHandle {
    inner: Arc<dyn PreferenceBackend>,
}

impl PrefsHandle {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            inner: Arc::new(FileBackend::open(path.into())),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            inner: Arc::new(MemoryBackend::default()),
        }
    }

    pub fn save(&self) -> anyhow::Result<()> {
        self.inner.save()
    }

    pub fn date_format(&self) -> String {
        self.inner
            .get(KEY_DATE_FORMAT)
            .unwrap_or_else(|| DEFAULT_DATE_FORMAT.to_string())
    }

    pub fn set_date_format(&self, pattern: &str) {
        self.inner.set(KEY_DATE_FORMAT, pattern);
    }

    pub fn color_scheme(&self) -> ColorScheme {
        match self.inner.get(KEY_COLOR_SCHEME).as_deref() {
            Some("light") => ColorScheme::Light,
            Some("dark") => ColorScheme::Dark,
            _ => ColorScheme::System,
        }
    }

    pub fn set_color_scheme(&self, scheme: ColorScheme) {
        let value = match scheme {
            ColorScheme::Light => "light",
            ColorScheme::Dark => "dark",
            ColorScheme::System => "system",
        };
        self.inner.set(KEY_COLOR_SCHEME, value);
    }

    pub fn group_mode(&self) -> GroupMode {
        match self.inner.get(KEY_GROUP_MODE).as_deref() {
            Some("day") => GroupMode::Day,
            Some("week") => GroupMode::Week,
            Some("year") => GroupMode::Year,
            _ => GroupMode::Month,
        }
    }

    pub fn set_group_mode(&self, mode: GroupMode) {
        let value = match mode {
            GroupMode::Day => "day",
            GroupMode::Week => "week",
            GroupMode::Month => "month",
            GroupMode::Year => "year",
        };
        self.inner.set(KEY_GROUP_MODE, value);
    }

    pub fn week_start_day(&self) -> u8 {
        self.get_u8(KEY_WEEK_START_DAY, 1, 1, 7)
    }

    pub fn set_week_start_day(&self, day: u8) {
        self.inner.set(KEY_WEEK_START_DAY, &day.to_string());
    }

    pub fn month_start_day(&self) -> u8 {
        self.get_u8(KEY_MONTH_START_DAY, 1, 1, 28)
    }

    pub fn set_month_start_day(&self, day: u8) {
        self.inner.set(KEY_MONTH_START_DAY, &day.to_string());
    }

    pub fn reminder_enabled(&self) -> bool {
        matches!(self.inner.get(KEY_REMINDER_ENABLED).as_deref(), Some("true"))
    }

    pub fn set_reminder_enabled(&self, enabled: bool) {
        self.inner
            .set(KEY_REMINDER_ENABLED, if enabled { "true" } else { "false" });
    }

    pub fn reminder_hour(&self) -> u8 {
        self.get_u8(KEY_REMINDER_HOUR, 20, 0, 23)
    }

    pub fn set_reminder_hour(&self, hour: u8) {
        self.inner.set(KEY_REMINDER_HOUR, &hour.to_string());
    }

    pub fn currency_display(&self) -> CurrencyDisplay {
        match self.inner.get(KEY_CURRENCY_DISPLAY).as_deref() {
            Some("iso") => CurrencyDisplay::Iso,
            Some("hidden") => CurrencyDisplay::Hidden,
            _ => CurrencyDisplay::Symbol,
        }
    }

    pub fn set_currency_display(&self, display: CurrencyDisplay) {
        let value = match display {
            CurrencyDisplay::Symbol => "symbol",
            CurrencyDisplay::Iso => "iso",
            CurrencyDisplay::Hidden => "hidden",
        };
        self.inner.set(KEY_CURRENCY_DISPLAY, value);
    }

    pub fn digit_grouping(&self) -> bool {
        !matches!(self.inner.get(KEY_DIGIT_GROUPING).as_deref(), Some("false"))
    }

    pub fn set_digit_grouping(&self, enabled: bool) {
        self.inner
            .set(KEY_DIGIT_GROUPING, if enabled { "true" } else { "false" });
    }

    pub fn rounding(&self) -> bool {
        matches!(self.inner.get(KEY_ROUNDING).as_deref(), Some("true"))
    }

    pub fn set_rounding(&self, enabled: bool) {
        self.inner
            .set(KEY_ROUNDING, if enabled { "true" } else { "false" });
    }

    fn get_u8(&self, key: &str, default: u8, min: u8, max: u8) -> u8 {
        self.inner
            .get(key)
            .and_then(|raw| raw.parse::<u8>().ok())
            .filter(|value| (min..=max).contains(value))
            .unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_apply_when_unset() {
        let prefs = PrefsHandle::in_memory();
        assert_eq!(prefs.date_format(), DEFAULT_DATE_FORMAT);
        assert_eq!(prefs.color_scheme(), ColorScheme::System);
        assert_eq!(prefs.group_mode(), GroupMode::Month);
        assert_eq!(prefs.week_start_day(), 1);
        assert!(!prefs.reminder_enabled());
        assert_eq!(prefs.reminder_hour(), 20);
        assert_eq!(prefs.currency_display(), CurrencyDisplay::Symbol);
        assert!(prefs.digit_grouping());
        assert!(!prefs.rounding());
    }

    #[test]
    fn out_of_range_values_fall_back() {
        let prefs = PrefsHandle::in_memory();
        prefs.set_week_start_day(9);
        assert_eq!(prefs.week_start_day(), 1);
        prefs.set_reminder_hour(23);
        assert_eq!(prefs.reminder_hour(), 23);
    }

    #[test]
    fn file_backend_round_trips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("prefs.json");

        let prefs = PrefsHandle::file(&path);
        prefs.set_color_scheme(ColorScheme::Dark);
        prefs.set_group_mode(GroupMode::Week);
        prefs.set_reminder_enabled(true);
        prefs.set_reminder_hour(8);
        prefs.save().unwrap();

        let reloaded = PrefsHandle::file(&path);
        assert_eq!(reloaded.color_scheme(), ColorScheme::Dark);
        assert_eq!(reloaded.group_mode(), GroupMode::Week);
        assert!(reloaded.reminder_enabled());
        assert_eq!(reloaded.reminder_hour(), 8);
    }
}
