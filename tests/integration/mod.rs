// Integration tests for Seat Watcher
// These wire the real store, coordinator, scheduler and command channel
// around a scripted page and a recording notifier.

pub mod api_tests;
pub mod monitoring_tests;
pub mod persistence_tests;

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use seat_watcher::{
    commands::{CommandSender, DEFAULT_QUEUE_DEPTH},
    config::MonitorConfig,
    extraction::extract_from_html,
    models::MonitorState,
    plugins::{
        ExtractionRequest, ExtractionResponse, NotificationResult, NotifierPlugin, PluginManager,
        RenderingContext, RenderingContextProvider, SeatAlert,
    },
    store::{MemoryStore, StateStore},
    web::AppState,
    CheckCoordinator, CourseRegistry, MonitorScheduler, MonitorService, Result, StateHandle,
};

pub const TEST_URL: &str = "https://registrar.example.edu/offered";

/// Builds a course table in the registrar's layout.
pub fn seat_page(rows: &[(&str, &str, u32)]) -> String {
    let body: String = rows
        .iter()
        .map(|(code, section, seats)| {
            format!(
                "<tr><td>{}</td><td>{}</td><td>Staff</td><td>{}</td></tr>",
                code, section, seats
            )
        })
        .collect();
    format!(
        "<html><body><table>\
         <thead><tr><th>Course</th><th>Section</th><th>Faculty</th>\
         <th>Seats Available</th></tr></thead>\
         <tbody>{}</tbody></table></body></html>",
        body
    )
}

/// Serves whatever HTML it currently holds, optionally after a delay.
#[derive(Default)]
pub struct ScriptedPage {
    html: Mutex<String>,
    delay: Mutex<Option<Duration>>,
    created: AtomicUsize,
    destroyed: AtomicUsize,
}

impl ScriptedPage {
    pub fn new(html: impl Into<String>) -> Arc<Self> {
        let page = Self::default();
        page.set_html(html);
        Arc::new(page)
    }

    pub fn set_html(&self, html: impl Into<String>) {
        *self.html.lock().unwrap() = html.into();
    }

    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock().unwrap() = delay;
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn destroyed(&self) -> usize {
        self.destroyed.load(Ordering::SeqCst)
    }
}

pub struct ScriptedProvider(pub Arc<ScriptedPage>);

struct ScriptedContext {
    page: Arc<ScriptedPage>,
    url: String,
}

#[async_trait]
impl RenderingContextProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn create(&self, url: &str) -> Result<Box<dyn RenderingContext>> {
        self.0.created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedContext {
            page: Arc::clone(&self.0),
            url: url.to_string(),
        }))
    }
}

#[async_trait]
impl RenderingContext for ScriptedContext {
    fn id(&self) -> &str {
        "scripted-tab"
    }

    async fn wait_until_ready(&mut self) -> Result<()> {
        Ok(())
    }

    async fn send(&mut self, request: &ExtractionRequest) -> Result<Option<ExtractionResponse>> {
        let delay = *self.page.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let html = self.page.html.lock().unwrap().clone();
        let results = extract_from_html(&request.courses, &html);
        Ok(Some(ExtractionResponse::success(results, Some(self.url.clone()))))
    }

    async fn destroy(self: Box<Self>) -> Result<()> {
        self.page.destroyed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Keeps every alert it is handed.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    alerts: Arc<Mutex<Vec<SeatAlert>>>,
}

impl RecordingNotifier {
    pub fn alerts(&self) -> Vec<SeatAlert> {
        self.alerts.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotifierPlugin for RecordingNotifier {
    fn name(&self) -> &str {
        "Recording"
    }

    fn plugin_type(&self) -> &str {
        "recording"
    }

    async fn notify(&self, alert: &SeatAlert) -> Result<NotificationResult> {
        self.alerts.lock().unwrap().push(alert.clone());
        Ok(NotificationResult::delivered(alert.id.clone()))
    }
}

/// A fully wired monitor over one store.
pub struct TestMonitor {
    pub state: StateHandle,
    pub page: Arc<ScriptedPage>,
    pub notifier: RecordingNotifier,
    pub coordinator: Arc<CheckCoordinator>,
    pub scheduler: Arc<MonitorScheduler>,
    pub commands: CommandSender,
}

impl TestMonitor {
    pub async fn start(
        store: Arc<dyn StateStore>,
        page: Arc<ScriptedPage>,
    ) -> anyhow::Result<Self> {
        let state = StateHandle::new(store, MonitorState::new(TEST_URL, 30));
        state.initialize().await?;

        let notifier = RecordingNotifier::default();
        let plugins = PluginManager::new();
        plugins.register_notifier(Box::new(notifier.clone())).await?;

        let config = MonitorConfig {
            check_url: TEST_URL.to_string(),
            extraction_timeout_secs: 1,
            ready_timeout_secs: 1,
            ..MonitorConfig::default()
        };
        let coordinator = Arc::new(CheckCoordinator::new(
            state.clone(),
            Arc::new(ScriptedProvider(Arc::clone(&page))),
            plugins,
            &config,
        ));
        let scheduler = Arc::new(MonitorScheduler::new(Arc::clone(&coordinator)).await?);
        scheduler.resume().await?;

        let registry = CourseRegistry::new(state.clone());
        let service = MonitorService::new(registry, Arc::clone(&scheduler));
        let (commands, _dispatcher) = service.spawn(DEFAULT_QUEUE_DEPTH);

        Ok(Self {
            state,
            page,
            notifier,
            coordinator,
            scheduler,
            commands,
        })
    }

    pub async fn in_memory(page: Arc<ScriptedPage>) -> anyhow::Result<Self> {
        Self::start(Arc::new(MemoryStore::new()), page).await
    }

    pub fn app_state(&self) -> AppState {
        AppState {
            commands: self.commands.clone(),
            state: self.state.clone(),
            scheduler: Arc::clone(&self.scheduler),
        }
    }

    pub async fn log_messages(&self) -> anyhow::Result<Vec<String>> {
        let snapshot = self.state.snapshot().await?;
        Ok(snapshot.logs.entries().iter().map(|e| e.message.clone()).collect())
    }

    pub async fn shutdown(&self) -> anyhow::Result<()> {
        self.scheduler.shutdown().await?;
        Ok(())
    }
}

/// Polls until `condition` holds or the timeout passes.
pub async fn wait_for_condition<F, Fut>(mut condition: F, timeout: Duration) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let start = std::time::Instant::now();

    while start.elapsed() < timeout {
        if condition().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    false
}
