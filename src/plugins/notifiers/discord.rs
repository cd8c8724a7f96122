use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::Retry;

use crate::config::DiscordConfig;
use crate::plugins::traits::{NotificationResult, NotifierPlugin, SeatAlert};
use crate::utils::error::Result;

const EMBED_COLOR: u32 = 0x00ff00;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct DiscordNotifier {
    client: Client,
    webhook_url: String,
    username: String,
    avatar_url: Option<String>,
    retry_attempts: usize,
    backoff_base: Duration,
    request_timeout: Duration,
}

impl DiscordNotifier {
    pub fn new(webhook_url: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            webhook_url: webhook_url.into(),
            username: username.into(),
            avatar_url: None,
            retry_attempts: 3,
            backoff_base: Duration::from_millis(250),
            request_timeout: REQUEST_TIMEOUT,
        }
    }

    /// `None` when no webhook is configured.
    pub fn from_config(config: &DiscordConfig) -> Option<Self> {
        let webhook_url = config.webhook_url.as_ref()?;
        Some(Self {
            avatar_url: config.avatar_url.clone(),
            retry_attempts: config.retry_attempts,
            ..Self::new(webhook_url.clone(), config.username.clone())
        })
    }

    pub fn with_retry(mut self, attempts: usize, backoff_base: Duration) -> Self {
        self.retry_attempts = attempts;
        self.backoff_base = backoff_base;
        self
    }

    /// Upper bound for a single webhook attempt.
    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    fn create_embed(&self, alert: &SeatAlert) -> Value {
        let seats = alert
            .seats
            .map(|count| count.to_string())
            .unwrap_or_else(|| "Unknown".to_string());

        json!({
            "title": format!("🎓 {}", alert.label),
            "description": alert.message,
            "url": alert.check_url,
            "color": EMBED_COLOR,
            "timestamp": alert.raised_at.to_rfc3339(),
            "fields": [
                { "name": "Seats", "value": seats, "inline": true },
                { "name": "Course", "value": alert.course_key, "inline": true }
            ],
            "footer": { "text": "Seat Watcher" }
        })
    }

    fn create_webhook_payload(&self, alert: &SeatAlert) -> Value {
        let mut payload = json!({
            "username": self.username,
            "embeds": [self.create_embed(alert)]
        });

        if let Some(avatar_url) = &self.avatar_url {
            payload["avatar_url"] = json!(avatar_url);
        }

        payload
    }

    async fn post(&self, payload: &Value) -> std::result::Result<(), reqwest::Error> {
        self.client
            .post(&self.webhook_url)
            .timeout(self.request_timeout)
            .json(payload)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

#[async_trait]
impl NotifierPlugin for DiscordNotifier {
    fn name(&self) -> &str {
        "Discord Notifier"
    }

    fn plugin_type(&self) -> &str {
        "discord"
    }

    async fn notify(&self, alert: &SeatAlert) -> Result<NotificationResult> {
        let payload = self.create_webhook_payload(alert);
        // 2^n * factor ms, so the first retry waits roughly `backoff_base`.
        let factor = (self.backoff_base.as_millis() as u64 / 2).max(1);
        let strategy = ExponentialBackoff::from_millis(2)
            .factor(factor)
            .map(jitter)
            .take(self.retry_attempts);

        match Retry::start(strategy, || self.post(&payload)).await {
            Ok(()) => Ok(NotificationResult::delivered(format!("discord-{}", alert.id))),
            Err(e) => {
                tracing::warn!(error = %e, "Discord webhook delivery failed");
                Ok(NotificationResult::failed(e.to_string()))
            }
        }
    }
}
