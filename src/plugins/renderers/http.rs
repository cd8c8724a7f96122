use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::config::RendererConfig;
use crate::extraction::extract_from_html;
use crate::models::generate_id;
use crate::plugins::traits::{
    ExtractionRequest, ExtractionResponse, RenderingContext, RenderingContextProvider,
};
use crate::utils::error::{AppError, Result};

/// Fetches the page once per context with a plain GET. Works for pages that
/// render their seat table server-side.
pub struct HttpRenderer {
    client: Client,
}

impl HttpRenderer {
    pub fn new(config: &RendererConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.request_timeout))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl RenderingContextProvider for HttpRenderer {
    fn name(&self) -> &str {
        "http"
    }

    async fn create(&self, url: &str) -> Result<Box<dyn RenderingContext>> {
        Ok(Box::new(HttpContext {
            id: generate_id(),
            client: self.client.clone(),
            url: url.to_string(),
            page: None,
        }))
    }
}

struct LoadedPage {
    final_url: String,
    body: String,
}

struct HttpContext {
    id: String,
    client: Client,
    url: String,
    page: Option<LoadedPage>,
}

#[async_trait]
impl RenderingContext for HttpContext {
    fn id(&self) -> &str {
        &self.id
    }

    async fn wait_until_ready(&mut self) -> Result<()> {
        let load_error =
            |e: reqwest::Error| AppError::Context(format!("Failed to load {}: {}", self.url, e));

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(load_error)?;
        let final_url = response.url().to_string();
        let body = response.text().await.map_err(load_error)?;

        tracing::debug!(context = %self.id, url = %final_url, bytes = body.len(), "Page loaded");
        self.page = Some(LoadedPage { final_url, body });
        Ok(())
    }

    async fn send(&mut self, request: &ExtractionRequest) -> Result<Option<ExtractionResponse>> {
        if !request.is_check_seats() {
            return Ok(Some(ExtractionResponse::unsupported(&request.action)));
        }

        let Some(page) = &self.page else {
            return Ok(None);
        };

        let results = extract_from_html(&request.courses, &page.body);
        Ok(Some(ExtractionResponse::success(results, Some(page.final_url.clone()))))
    }

    async fn destroy(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}
