use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::notifiers::{DiscordNotifier, EmailNotifier, LogNotifier};
use super::traits::{NotifierPlugin, SeatAlert};
use crate::config::NotificationsConfig;
use crate::utils::error::Result;

pub type NotifierPluginBox = Box<dyn NotifierPlugin>;

/// How one alert fared across the registered notifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlertReport {
    pub delivered: Vec<String>,
    pub failed: Vec<(String, String)>,
}

impl AlertReport {
    pub fn all_delivered(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Clone)]
pub struct PluginManager {
    notifiers: Arc<RwLock<HashMap<String, NotifierPluginBox>>>,
}

impl PluginManager {
    pub fn new() -> Self {
        Self {
            notifiers: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Registers every notifier the configuration enables.
    pub async fn from_config(config: &NotificationsConfig) -> Result<Self> {
        let manager = Self::new();

        if config.log_alerts {
            manager.register_notifier(Box::new(LogNotifier::new())).await?;
        }

        if let Some(discord) = DiscordNotifier::from_config(&config.discord) {
            manager.register_notifier(Box::new(discord)).await?;
        }

        if let Some(email) = EmailNotifier::from_config(&config.smtp)? {
            manager.register_notifier(Box::new(email)).await?;
        }

        tracing::info!(notifiers = ?manager.list_notifier_types().await, "Alert notifiers ready");
        Ok(manager)
    }

    /// Register a notifier plugin, replacing any of the same type
    pub async fn register_notifier(&self, plugin: NotifierPluginBox) -> Result<()> {
        let plugin_type = plugin.plugin_type().to_string();

        let mut notifiers = self.notifiers.write().await;
        notifiers.insert(plugin_type, plugin);
        Ok(())
    }

    pub async fn has_notifier(&self, plugin_type: &str) -> bool {
        let notifiers = self.notifiers.read().await;
        notifiers.contains_key(plugin_type)
    }

    pub async fn list_notifier_types(&self) -> Vec<String> {
        let notifiers = self.notifiers.read().await;
        let mut types: Vec<String> = notifiers.keys().cloned().collect();
        types.sort();
        types
    }

    /// Sends `alert` through every notifier at once. A failing notifier is
    /// logged and recorded in the report; it never fails the call.
    pub async fn dispatch_alert(&self, alert: &SeatAlert) -> AlertReport {
        let notifiers = self.notifiers.read().await;

        let deliveries = notifiers.iter().map(|(plugin_type, notifier)| async move {
            let outcome = match notifier.notify(alert).await {
                Ok(result) if result.success => Ok(()),
                Ok(result) => Err(result.error.unwrap_or_else(|| "delivery failed".to_string())),
                Err(e) => Err(e.to_string()),
            };
            (plugin_type.clone(), outcome)
        });

        let mut report = AlertReport::default();
        for (plugin_type, outcome) in join_all(deliveries).await {
            match outcome {
                Ok(()) => report.delivered.push(plugin_type),
                Err(error) => {
                    tracing::warn!(
                        notifier = %plugin_type,
                        course = %alert.course_key,
                        %error,
                        "Alert delivery failed"
                    );
                    report.failed.push((plugin_type, error));
                }
            }
        }

        report
    }

    pub async fn shutdown(&self) -> Result<()> {
        let mut notifiers = self.notifiers.write().await;
        for (_, plugin) in notifiers.drain() {
            if let Err(e) = plugin.shutdown().await {
                tracing::warn!("Error shutting down notifier plugin: {}", e);
            }
        }

        Ok(())
    }
}

impl Default for PluginManager {
    fn default() -> Self {
        Self::new()
    }
}
