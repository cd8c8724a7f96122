use chrono::{DateTime, Utc};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

use super::StateStore;
use crate::models::{
    keys, CheckResult, Course, LoadedState, LogEntry, LogType, MonitorState, Theme,
};
use crate::utils::error::Result;

type Fields = &'static [&'static str];

/// Shared access to the persisted [`MonitorState`].
///
/// Every operation loads the record, applies one named change and writes
/// back only the fields it touched, all while holding a single async lock.
/// Two operations therefore never interleave between read and write.
/// `revision` counts committed writes.
#[derive(Clone)]
pub struct StateHandle {
    store: Arc<dyn StateStore>,
    defaults: Arc<MonitorState>,
    lock: Arc<Mutex<()>>,
    revision: Arc<AtomicU64>,
}

impl StateHandle {
    pub fn new(store: Arc<dyn StateStore>, defaults: MonitorState) -> Self {
        Self {
            store,
            defaults: Arc::new(defaults),
            lock: Arc::new(Mutex::new(())),
            revision: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::SeqCst)
    }

    pub fn defaults(&self) -> &MonitorState {
        &self.defaults
    }

    pub async fn snapshot(&self) -> Result<MonitorState> {
        let _guard = self.lock.lock().await;
        self.load().await
    }

    /// Writes defaults for every field storage does not hold yet.
    pub async fn initialize(&self) -> Result<MonitorState> {
        let _guard = self.lock.lock().await;
        let present = self.store.get_all().await?;
        let missing: Vec<&str> = keys::ALL
            .iter()
            .copied()
            .filter(|key| !present.contains_key(*key))
            .collect();

        let state = self.load().await?;
        if !missing.is_empty() {
            self.store.set_many(state.entries(&missing)?).await?;
            self.revision.fetch_add(1, Ordering::SeqCst);
            tracing::info!(fields = ?missing, "Initialized monitor state defaults");
        }
        Ok(state)
    }

    pub async fn append_log(&self, message: impl Into<String>, kind: LogType) -> Result<LogEntry> {
        let entry = LogEntry::new(message, kind);
        match kind {
            LogType::Error => tracing::error!(message = %entry.message, "activity"),
            LogType::Warning => tracing::warn!(message = %entry.message, "activity"),
            LogType::Info | LogType::Success => {
                tracing::info!(kind = kind.as_str(), message = %entry.message, "activity")
            }
        }

        self.mutate(move |state| {
            state.logs.record(entry.clone());
            (entry, &[keys::LOGS] as Fields)
        })
        .await
    }

    /// Appends `course` unless its key is already tracked.
    pub async fn add_course(&self, course: Course) -> Result<bool> {
        self.mutate(move |state| {
            if state.has_course(&course.key) {
                return (false, &[] as Fields);
            }
            state.courses.push(course);
            (true, &[keys::COURSES] as Fields)
        })
        .await
    }

    /// Drops the course and its remembered availability.
    pub async fn remove_course(&self, key: &str) -> Result<Option<Course>> {
        let key = key.to_string();
        self.mutate(move |state| {
            let Some(position) = state.courses.iter().position(|c| c.key == key) else {
                return (None, &[] as Fields);
            };
            let removed = state.courses.remove(position);
            state.last_availability.remove(&key);
            (Some(removed), &[keys::COURSES, keys::LAST_AVAILABILITY] as Fields)
        })
        .await
    }

    /// Merges fresh results into `lastAvailability` and stamps `lastCheck`
    /// in one write. Results for courses removed since the check started are
    /// dropped. Returns the map as it was before the merge.
    pub async fn record_check(
        &self,
        results: &[CheckResult],
        checked_at: DateTime<Utc>,
    ) -> Result<BTreeMap<String, bool>> {
        let updates: Vec<(String, bool)> = results
            .iter()
            .map(|r| (r.key.clone(), r.available))
            .collect();

        self.mutate(move |state| {
            let previous = state.last_availability.clone();
            let tracked: Vec<(String, bool)> = updates
                .into_iter()
                .filter(|(key, _)| state.has_course(key))
                .collect();
            state.last_availability.extend(tracked);
            state.last_check = Some(checked_at);
            (previous, &[keys::LAST_AVAILABILITY, keys::LAST_CHECK] as Fields)
        })
        .await
    }

    /// Persists the monitoring flag. When enabling, also persists the
    /// interval (falling back to the stored one) and returns it.
    pub async fn set_monitoring(
        &self,
        enabled: bool,
        interval_seconds: Option<u64>,
    ) -> Result<u64> {
        self.mutate(move |state| {
            state.monitoring = enabled;
            if !enabled {
                return (state.interval_seconds, &[keys::MONITORING] as Fields);
            }
            state.interval_seconds = interval_seconds.unwrap_or(state.interval_seconds).max(1);
            (
                state.interval_seconds,
                &[keys::MONITORING, keys::INTERVAL_SECONDS] as Fields,
            )
        })
        .await
    }

    pub async fn set_theme(&self, theme: Theme) -> Result<()> {
        self.mutate(move |state| {
            state.theme = theme;
            ((), &[keys::THEME] as Fields)
        })
        .await
    }

    pub async fn set_check_url(&self, check_url: String) -> Result<()> {
        self.mutate(move |state| {
            state.check_url = check_url;
            ((), &[keys::CHECK_URL] as Fields)
        })
        .await
    }

    async fn mutate<R, F>(&self, op: F) -> Result<R>
    where
        F: FnOnce(&mut MonitorState) -> (R, Fields),
    {
        let _guard = self.lock.lock().await;
        let mut state = self.load().await?;
        let (outcome, fields) = op(&mut state);
        if !fields.is_empty() {
            self.store.set_many(state.entries(fields)?).await?;
            self.revision.fetch_add(1, Ordering::SeqCst);
        }
        Ok(outcome)
    }

    /// Caller must hold `lock`.
    async fn load(&self) -> Result<MonitorState> {
        let entries = self.store.get_all().await?;
        let LoadedState { state, migration } = MonitorState::from_entries(&entries, &self.defaults);

        if let Some(migration) = migration {
            if let Some(seconds) = migration.converted_interval {
                self.store
                    .set_many(vec![(keys::INTERVAL_SECONDS.to_string(), json!(seconds))])
                    .await?;
                tracing::info!(interval_seconds = seconds, "Converted legacy check interval");
            }
            self.store.remove(&[keys::LEGACY_INTERVAL_MINUTES]).await?;
        }

        Ok(state)
    }
}
