use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

use crate::models::{ActivityLog, Course, Theme};
use crate::utils::error::{AppError, Result};

pub const DEFAULT_INTERVAL_SECONDS: u64 = 30;

/// Fixed storage keys, one per persisted field.
pub mod keys {
    pub const COURSES: &str = "courses";
    pub const INTERVAL_SECONDS: &str = "intervalSeconds";
    pub const MONITORING: &str = "monitoring";
    pub const LOGS: &str = "logs";
    pub const LAST_AVAILABILITY: &str = "lastAvailability";
    pub const LAST_CHECK: &str = "lastCheck";
    pub const THEME: &str = "theme";
    pub const CHECK_URL: &str = "checkUrl";

    /// Written by older releases; folded into `intervalSeconds` on load.
    pub const LEGACY_INTERVAL_MINUTES: &str = "intervalMinutes";

    pub const ALL: [&str; 8] = [
        COURSES,
        INTERVAL_SECONDS,
        MONITORING,
        LOGS,
        LAST_AVAILABILITY,
        LAST_CHECK,
        THEME,
        CHECK_URL,
    ];
}

/// Everything the monitor persists between runs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MonitorState {
    pub courses: Vec<Course>,
    pub interval_seconds: u64,
    pub monitoring: bool,
    pub logs: ActivityLog,
    pub last_availability: BTreeMap<String, bool>,
    pub last_check: Option<DateTime<Utc>>,
    pub theme: Theme,
    pub check_url: String,
}

/// What a load found in storage that needs rewriting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyMigration {
    /// Interval derived from `intervalMinutes`, if it had to be converted.
    pub converted_interval: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct LoadedState {
    pub state: MonitorState,
    pub migration: Option<LegacyMigration>,
}

impl MonitorState {
    pub fn new(check_url: impl Into<String>, interval_seconds: u64) -> Self {
        Self {
            courses: Vec::new(),
            interval_seconds: interval_seconds.max(1),
            monitoring: false,
            logs: ActivityLog::default(),
            last_availability: BTreeMap::new(),
            last_check: None,
            theme: Theme::default(),
            check_url: check_url.into(),
        }
    }

    pub fn find_course(&self, key: &str) -> Option<&Course> {
        self.courses.iter().find(|c| c.key == key)
    }

    pub fn has_course(&self, key: &str) -> bool {
        self.find_course(key).is_some()
    }

    /// Serialized value of a single field, keyed as in storage.
    pub fn field(&self, key: &str) -> Result<Value> {
        let value = match key {
            keys::COURSES => serde_json::to_value(&self.courses)?,
            keys::INTERVAL_SECONDS => serde_json::to_value(self.interval_seconds)?,
            keys::MONITORING => serde_json::to_value(self.monitoring)?,
            keys::LOGS => serde_json::to_value(&self.logs)?,
            keys::LAST_AVAILABILITY => serde_json::to_value(&self.last_availability)?,
            keys::LAST_CHECK => serde_json::to_value(self.last_check)?,
            keys::THEME => serde_json::to_value(self.theme)?,
            keys::CHECK_URL => serde_json::to_value(&self.check_url)?,
            other => return Err(AppError::Internal(format!("unknown state field: {}", other))),
        };
        Ok(value)
    }

    pub fn entries(&self, fields: &[&str]) -> Result<Vec<(String, Value)>> {
        fields
            .iter()
            .map(|key| Ok((key.to_string(), self.field(key)?)))
            .collect()
    }

    /// Rebuilds the state from raw storage entries, filling absent or
    /// unreadable fields from `defaults`.
    pub fn from_entries(entries: &HashMap<String, Value>, defaults: &MonitorState) -> LoadedState {
        let stored_interval = entries
            .get(keys::INTERVAL_SECONDS)
            .and_then(Value::as_u64)
            .filter(|secs| *secs > 0);
        let legacy_minutes = entries.get(keys::LEGACY_INTERVAL_MINUTES);

        let converted_interval = match (stored_interval, legacy_minutes.and_then(Value::as_u64)) {
            (None, Some(minutes)) if minutes > 0 => Some(minutes.saturating_mul(60)),
            _ => None,
        };
        let migration = legacy_minutes.map(|_| LegacyMigration { converted_interval });

        let state = MonitorState {
            courses: decode(entries, keys::COURSES, || defaults.courses.clone()),
            interval_seconds: stored_interval
                .or(converted_interval)
                .unwrap_or(defaults.interval_seconds),
            monitoring: decode(entries, keys::MONITORING, || defaults.monitoring),
            logs: decode(entries, keys::LOGS, || defaults.logs.clone()),
            last_availability: decode(entries, keys::LAST_AVAILABILITY, || {
                defaults.last_availability.clone()
            }),
            last_check: decode(entries, keys::LAST_CHECK, || defaults.last_check),
            theme: decode(entries, keys::THEME, || defaults.theme),
            check_url: decode(entries, keys::CHECK_URL, || defaults.check_url.clone()),
        };

        LoadedState { state, migration }
    }
}

fn decode<T, F>(entries: &HashMap<String, Value>, key: &str, default: F) -> T
where
    T: DeserializeOwned,
    F: FnOnce() -> T,
{
    match entries.get(key) {
        None => default(),
        Some(value) => serde_json::from_value(value.clone()).unwrap_or_else(|e| {
            tracing::warn!(field = key, error = %e, "Ignoring unreadable state field");
            default()
        }),
    }
}
