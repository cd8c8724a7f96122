use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::ffi::OsStr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task;

use crate::config::RendererConfig;
use crate::extraction::extract_from_html;
use crate::models::generate_id;
use crate::plugins::traits::{
    ExtractionRequest, ExtractionResponse, RenderingContext, RenderingContextProvider,
};
use crate::utils::error::{AppError, Result};

/// Drives a headless Chrome. The browser is launched on first use and
/// shared; every context gets its own tab.
pub struct ChromeRenderer {
    config: RendererConfig,
    browser: Mutex<Option<Arc<Browser>>>,
}

impl ChromeRenderer {
    pub fn new(config: RendererConfig) -> Self {
        Self {
            config,
            browser: Mutex::new(None),
        }
    }

    fn launch_options(config: &RendererConfig) -> Result<LaunchOptions<'static>> {
        let mut launch_options = LaunchOptions::default_builder()
            .headless(true)
            .sandbox(false) // Often needed in containerized environments
            .args(vec![
                OsStr::new("--no-sandbox"),
                OsStr::new("--disable-dev-shm-usage"),
                OsStr::new("--disable-gpu"),
                OsStr::new("--disable-extensions"),
            ])
            .build()
            .map_err(|e| AppError::Context(format!("Failed to create launch options: {}", e)))?;

        if let Some(chrome_path) = &config.chrome_path {
            launch_options.path = Some(PathBuf::from(chrome_path));
        }

        Ok(launch_options)
    }

    async fn browser(&self) -> Result<Arc<Browser>> {
        let mut slot = self.browser.lock().await;
        if let Some(browser) = slot.as_ref() {
            return Ok(browser.clone());
        }

        let options = Self::launch_options(&self.config)?;
        let browser = task::spawn_blocking(move || Browser::new(options))
            .await?
            .map_err(|e| AppError::Context(format!("Failed to launch browser: {}", e)))?;

        tracing::info!("Launched headless browser");
        let browser = Arc::new(browser);
        *slot = Some(browser.clone());
        Ok(browser)
    }

    /// Forgets the shared browser so the next context relaunches it.
    async fn discard_browser(&self) {
        self.browser.lock().await.take();
    }
}

#[async_trait]
impl RenderingContextProvider for ChromeRenderer {
    fn name(&self) -> &str {
        "chrome"
    }

    async fn create(&self, url: &str) -> Result<Box<dyn RenderingContext>> {
        let browser = self.browser().await?;
        let user_agent = self.config.user_agent.clone();
        let timeout = Duration::from_secs(self.config.request_timeout);

        let opened = task::spawn_blocking(move || -> anyhow::Result<Arc<Tab>> {
            let tab = browser.new_tab()?;
            tab.set_default_timeout(timeout);
            tab.set_user_agent(&user_agent, None, None)?;
            Ok(tab)
        })
        .await?;

        let tab = match opened {
            Ok(tab) => tab,
            Err(e) => {
                self.discard_browser().await;
                return Err(AppError::Context(format!("Failed to create tab: {}", e)));
            }
        };

        Ok(Box::new(ChromeContext {
            id: generate_id(),
            tab,
            url: url.to_string(),
        }))
    }
}

struct ChromeContext {
    id: String,
    tab: Arc<Tab>,
    url: String,
}

#[async_trait]
impl RenderingContext for ChromeContext {
    fn id(&self) -> &str {
        &self.id
    }

    async fn wait_until_ready(&mut self) -> Result<()> {
        let tab = self.tab.clone();
        let url = self.url.clone();

        task::spawn_blocking(move || -> anyhow::Result<()> {
            tab.navigate_to(&url)?;
            tab.wait_until_navigated()?;
            Ok(())
        })
        .await?
        .map_err(|e| AppError::Context(format!("Page load failed: {}", e)))
    }

    async fn send(&mut self, request: &ExtractionRequest) -> Result<Option<ExtractionResponse>> {
        if !request.is_check_seats() {
            return Ok(Some(ExtractionResponse::unsupported(&request.action)));
        }

        let tab = self.tab.clone();
        let rendered = task::spawn_blocking(move || -> anyhow::Result<(String, String)> {
            let html = tab.get_content()?;
            Ok((html, tab.get_url()))
        })
        .await?;

        let response = match rendered {
            Ok((html, final_url)) => {
                let results = extract_from_html(&request.courses, &html);
                ExtractionResponse::success(results, Some(final_url))
            }
            Err(e) => ExtractionResponse::failure(format!("Failed to read page content: {}", e)),
        };

        Ok(Some(response))
    }

    async fn destroy(self: Box<Self>) -> Result<()> {
        let tab = self.tab.clone();
        task::spawn_blocking(move || tab.close(true))
            .await?
            .map(|_| ())
            .map_err(|e| AppError::Context(format!("Failed to close tab: {}", e)))
    }
}
