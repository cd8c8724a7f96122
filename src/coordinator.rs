//! One end-to-end seat check: acquire a rendering context, delegate
//! extraction under a deadline, release the context, then reconcile the
//! results against the previously observed availability.

use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;

use crate::config::MonitorConfig;
use crate::models::{CheckResult, LogType, MonitorState};
use crate::plugins::traits::{
    ExtractionRequest, ExtractionResponse, RenderingContext, RenderingContextProvider, SeatAlert,
};
use crate::plugins::PluginManager;
use crate::store::StateHandle;
use crate::utils::error::{AppError, Result};
use crate::utils::telemetry::{ALERTS_TOTAL, CHECKS_TOTAL, CHECK_DURATION_SECONDS};

pub const EXTRACTION_TIMEOUT_MESSAGE: &str = "Timed out waiting for seat availability response.";
pub const READY_TIMEOUT_MESSAGE: &str = "Timed out waiting for the page to finish loading.";
pub const NO_RESPONSE_MESSAGE: &str = "No data returned from rendering context.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FlightState {
    Idle,
    Running,
}

/// Single-flight gate. The only transitions are Idle -> Running through
/// [`FlightGuard::try_begin`] and Running -> Idle when the permit drops.
#[derive(Debug, Default)]
pub struct FlightGuard {
    running: AtomicBool,
}

impl FlightGuard {
    pub fn state(&self) -> FlightState {
        if self.running.load(Ordering::SeqCst) {
            FlightState::Running
        } else {
            FlightState::Idle
        }
    }

    /// `None` while another cycle holds the permit.
    pub fn try_begin(&self) -> Option<FlightPermit<'_>> {
        self.running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| FlightPermit { guard: self })
    }
}

pub struct FlightPermit<'a> {
    guard: &'a FlightGuard,
}

impl Drop for FlightPermit<'_> {
    fn drop(&mut self) {
        self.guard.running.store(false, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckSummary {
    pub results: Vec<CheckResult>,
    pub alerts: Vec<SeatAlert>,
    pub checked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CheckOutcome {
    /// Another cycle was in flight; nothing was logged or written.
    AlreadyRunning,
    NoCourses,
    Failed { reason: String },
    Completed(CheckSummary),
}

impl CheckOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            CheckOutcome::AlreadyRunning => "already_running",
            CheckOutcome::NoCourses => "no_courses",
            CheckOutcome::Failed { .. } => "failed",
            CheckOutcome::Completed(_) => "completed",
        }
    }
}

pub struct CheckCoordinator {
    state: StateHandle,
    renderer: Arc<dyn RenderingContextProvider>,
    plugins: PluginManager,
    ready_timeout: Duration,
    extraction_timeout: Duration,
    alert_timeout: Duration,
    flight: FlightGuard,
}

impl CheckCoordinator {
    pub fn new(
        state: StateHandle,
        renderer: Arc<dyn RenderingContextProvider>,
        plugins: PluginManager,
        config: &MonitorConfig,
    ) -> Self {
        Self {
            state,
            renderer,
            plugins,
            ready_timeout: config.ready_timeout(),
            extraction_timeout: config.extraction_timeout(),
            alert_timeout: config.alert_timeout(),
            flight: FlightGuard::default(),
        }
    }

    pub fn with_deadlines(mut self, ready: Duration, extraction: Duration) -> Self {
        self.ready_timeout = ready;
        self.extraction_timeout = extraction;
        self
    }

    /// Bounds how long one alert may spend in the notifiers before the cycle
    /// moves on.
    pub fn with_alert_timeout(mut self, alert: Duration) -> Self {
        self.alert_timeout = alert;
        self
    }

    pub fn flight_state(&self) -> FlightState {
        self.flight.state()
    }

    pub fn state(&self) -> &StateHandle {
        &self.state
    }

    /// Runs one cycle. Never returns an error: every failure ends up on the
    /// activity log and in [`CheckOutcome::Failed`].
    pub async fn run_check(&self) -> CheckOutcome {
        let Some(_permit) = self.flight.try_begin() else {
            tracing::debug!("Check already in flight, skipping trigger");
            return CheckOutcome::AlreadyRunning;
        };

        let started = Instant::now();
        let outcome = match self.execute().await {
            Ok(outcome) => outcome,
            Err(e) => {
                let reason = format!("Error while checking seats: {}", e);
                self.log(reason.clone(), LogType::Error).await;
                CheckOutcome::Failed { reason }
            }
        };

        counter!(CHECKS_TOTAL, "outcome" => outcome.label()).increment(1);
        histogram!(CHECK_DURATION_SECONDS).record(started.elapsed().as_secs_f64());
        outcome
    }

    async fn execute(&self) -> Result<CheckOutcome> {
        let state = self.state.snapshot().await?;
        if state.courses.is_empty() {
            self.state
                .append_log("No courses configured for monitoring.", LogType::Warning)
                .await?;
            return Ok(CheckOutcome::NoCourses);
        }

        self.state
            .append_log("Starting seat availability check...", LogType::Info)
            .await?;

        let response = self.delegate(&state).await?;
        let results = match response.map(ExtractionResponse::into_outcome) {
            Some(Ok(results)) => results,
            Some(Err(reason)) => {
                self.state.append_log(reason.clone(), LogType::Error).await?;
                return Ok(CheckOutcome::Failed { reason });
            }
            None => {
                self.state.append_log(NO_RESPONSE_MESSAGE, LogType::Error).await?;
                return Ok(CheckOutcome::Failed {
                    reason: NO_RESPONSE_MESSAGE.to_string(),
                });
            }
        };

        self.reconcile(&state, results).await
    }

    /// Acquires a context, runs the exchange and releases the context on
    /// every path. Release failures are only logged.
    async fn delegate(&self, state: &MonitorState) -> Result<Option<ExtractionResponse>> {
        let mut context = self.renderer.create(&state.check_url).await?;
        let context_id = context.id().to_string();
        tracing::debug!(
            context = %context_id,
            url = %state.check_url,
            "Rendering context created"
        );

        let request = ExtractionRequest::check_seats(state.courses.clone());
        let outcome = self.exchange(context.as_mut(), &request).await;

        if let Err(e) = context.destroy().await {
            tracing::warn!(
                context = %context_id,
                error = %e,
                "Failed to release rendering context"
            );
        }

        outcome
    }

    async fn exchange(
        &self,
        context: &mut dyn RenderingContext,
        request: &ExtractionRequest,
    ) -> Result<Option<ExtractionResponse>> {
        timeout(self.ready_timeout, context.wait_until_ready())
            .await
            .map_err(|_| AppError::Context(READY_TIMEOUT_MESSAGE.to_string()))??;

        // Whichever of reply and deadline finishes first wins; a late reply
        // is dropped with the future.
        timeout(self.extraction_timeout, context.send(request))
            .await
            .map_err(|_| AppError::Timeout(EXTRACTION_TIMEOUT_MESSAGE.to_string()))?
    }

    /// Runs while the flight permit is held, so a stalled notifier is cut
    /// off at the alert deadline.
    async fn deliver(&self, alert: &SeatAlert) {
        if timeout(self.alert_timeout, self.plugins.dispatch_alert(alert)).await.is_err() {
            tracing::warn!(
                course = %alert.course_key,
                timeout_ms = self.alert_timeout.as_millis() as u64,
                "Alert delivery timed out"
            );
        }
    }

    async fn reconcile(
        &self,
        state: &MonitorState,
        results: Vec<CheckResult>,
    ) -> Result<CheckOutcome> {
        let checked_at = Utc::now();
        // Transitions are judged against the map as it was before this write.
        let previous = self.state.record_check(&results, checked_at).await?;

        if !results.iter().any(|result| result.available) {
            self.state
                .append_log("No seats found in monitored courses.", LogType::Info)
                .await?;
        }

        let mut alerts = Vec::new();
        for result in &results {
            let was_available = previous.get(&result.key).copied().unwrap_or(false);

            if result.available && !was_available {
                let alert = SeatAlert::for_result(result, &state.check_url);
                self.deliver(&alert).await;
                counter!(ALERTS_TOTAL).increment(1);
                self.state.append_log(alert.message.clone(), LogType::Success).await?;
                alerts.push(alert);
            } else if !result.available {
                self.state
                    .append_log(format!("No seats for {}.", result.label), LogType::Info)
                    .await?;
            }
        }

        tracing::info!(
            courses = results.len(),
            alerts = alerts.len(),
            "Seat check completed"
        );

        Ok(CheckOutcome::Completed(CheckSummary {
            results,
            alerts,
            checked_at,
        }))
    }

    async fn log(&self, message: String, kind: LogType) {
        if let Err(e) = self.state.append_log(message, kind).await {
            tracing::error!(error = %e, "Failed to write activity log");
        }
    }
}
