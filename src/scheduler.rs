use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler};
use uuid::Uuid;

use crate::coordinator::{CheckCoordinator, CheckOutcome, FlightState};
use crate::models::LogType;
use crate::store::StateHandle;
use crate::utils::error::Result;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleInfo {
    pub armed: bool,
    pub job_id: Option<Uuid>,
    pub interval_seconds: Option<u64>,
    pub armed_at: Option<DateTime<Utc>>,
    pub timer_runs: u64,
    pub skipped_runs: u64,
    pub in_flight: bool,
}

#[derive(Debug, Clone)]
struct ArmedJob {
    id: Uuid,
    interval_seconds: u64,
    armed_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct TimerStats {
    runs: AtomicU64,
    skipped: AtomicU64,
}

impl TimerStats {
    fn record(&self, outcome: &CheckOutcome) {
        self.runs.fetch_add(1, Ordering::Relaxed);
        if matches!(outcome, CheckOutcome::AlreadyRunning) {
            self.skipped.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Owns the single repeating timer that drives the coordinator. At most one
/// job is armed at a time; re-arming replaces it.
pub struct MonitorScheduler {
    scheduler: JobScheduler,
    coordinator: Arc<CheckCoordinator>,
    armed: Mutex<Option<ArmedJob>>,
    stats: Arc<TimerStats>,
}

impl MonitorScheduler {
    pub async fn new(coordinator: Arc<CheckCoordinator>) -> Result<Self> {
        let scheduler = JobScheduler::new().await?;
        scheduler.start().await?;
        tracing::debug!("Job scheduler started");

        Ok(Self {
            scheduler,
            coordinator,
            armed: Mutex::new(None),
            stats: Arc::new(TimerStats::default()),
        })
    }

    fn state(&self) -> &StateHandle {
        self.coordinator.state()
    }

    pub fn coordinator(&self) -> &Arc<CheckCoordinator> {
        &self.coordinator
    }

    /// [`MonitorScheduler::enable`] followed by one immediate check.
    pub async fn start(&self, interval_seconds: Option<u64>) -> Result<u64> {
        let interval = self.enable(interval_seconds).await?;
        self.coordinator.run_check().await;
        Ok(interval)
    }

    /// Persists monitoring on and (re)arms the timer without running a
    /// check. Returns the interval in effect.
    pub async fn enable(&self, interval_seconds: Option<u64>) -> Result<u64> {
        let interval = self.state().set_monitoring(true, interval_seconds).await?;
        self.arm(interval).await?;

        self.state()
            .append_log(
                format!("Monitoring started. Checks every {} seconds.", interval),
                LogType::Success,
            )
            .await?;

        Ok(interval)
    }

    pub async fn stop(&self) -> Result<()> {
        self.disarm().await?;
        self.state().set_monitoring(false, None).await?;
        self.state().append_log("Monitoring stopped.", LogType::Warning).await?;
        Ok(())
    }

    /// Re-arms the timer after a restart when monitoring was left on.
    /// Returns whether a timer was armed.
    pub async fn resume(&self) -> Result<bool> {
        let state = self.state().snapshot().await?;
        if !state.monitoring {
            return Ok(false);
        }

        self.arm(state.interval_seconds.max(1)).await?;
        tracing::info!(
            interval_seconds = state.interval_seconds,
            "Resumed monitoring from persisted state"
        );
        Ok(true)
    }

    pub async fn schedule_info(&self) -> ScheduleInfo {
        let armed = self.armed.lock().await.clone();
        ScheduleInfo {
            armed: armed.is_some(),
            job_id: armed.as_ref().map(|job| job.id),
            interval_seconds: armed.as_ref().map(|job| job.interval_seconds),
            armed_at: armed.as_ref().map(|job| job.armed_at),
            timer_runs: self.stats.runs.load(Ordering::Relaxed),
            skipped_runs: self.stats.skipped.load(Ordering::Relaxed),
            in_flight: self.coordinator.flight_state() == FlightState::Running,
        }
    }

    pub async fn is_armed(&self) -> bool {
        self.armed.lock().await.is_some()
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.disarm().await?;
        let mut scheduler = self.scheduler.clone();
        scheduler.shutdown().await?;
        tracing::info!("Monitor scheduler shutdown");
        Ok(())
    }

    async fn arm(&self, interval_seconds: u64) -> Result<Uuid> {
        let mut armed = self.armed.lock().await;
        if let Some(previous) = armed.take() {
            self.scheduler.remove(&previous.id).await?;
        }

        let coordinator = Arc::clone(&self.coordinator);
        let stats = Arc::clone(&self.stats);
        let job = Job::new_repeated_async(Duration::from_secs(interval_seconds), move |_uuid, _l| {
            let coordinator = Arc::clone(&coordinator);
            let stats = Arc::clone(&stats);

            Box::pin(async move {
                let outcome = coordinator.run_check().await;
                stats.record(&outcome);
            })
        })?;

        let id = self.scheduler.add(job).await?;
        *armed = Some(ArmedJob {
            id,
            interval_seconds,
            armed_at: Utc::now(),
        });

        tracing::info!(job = %id, interval_seconds, "Armed check timer");
        Ok(id)
    }

    async fn disarm(&self) -> Result<()> {
        if let Some(previous) = self.armed.lock().await.take() {
            self.scheduler.remove(&previous.id).await?;
            tracing::info!(job = %previous.id, "Disarmed check timer");
        }
        Ok(())
    }
}
