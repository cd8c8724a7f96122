use async_trait::async_trait;

use crate::plugins::traits::{NotificationResult, NotifierPlugin, SeatAlert};
use crate::utils::error::Result;

/// Writes alerts to the tracing output. Useful on headless hosts and as the
/// fallback when nothing else is configured.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotifierPlugin for LogNotifier {
    fn name(&self) -> &str {
        "Log Notifier"
    }

    fn plugin_type(&self) -> &str {
        "log"
    }

    async fn notify(&self, alert: &SeatAlert) -> Result<NotificationResult> {
        tracing::info!(
            target: "seat_watcher::alerts",
            course = %alert.course_key,
            seats = ?alert.seats,
            url = %alert.check_url,
            "{}",
            alert.message
        );
        Ok(NotificationResult::delivered(alert.id.clone()))
    }
}
