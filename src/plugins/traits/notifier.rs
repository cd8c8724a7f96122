use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{generate_id, CheckResult};
use crate::utils::error::Result;

/// Raised once per course whose seats just became available.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SeatAlert {
    pub id: String,
    pub title: String,
    pub message: String,
    pub course_key: String,
    pub label: String,
    pub seats: Option<u32>,
    pub check_url: String,
    pub raised_at: DateTime<Utc>,
}

impl SeatAlert {
    pub fn for_result(result: &CheckResult, check_url: &str) -> Self {
        Self {
            id: generate_id(),
            title: "Course seat available".to_string(),
            message: format!("Seats available for {}.", result.label),
            course_key: result.key.clone(),
            label: result.label.clone(),
            seats: result.seats,
            check_url: check_url.to_string(),
            raised_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotificationResult {
    pub success: bool,
    pub message_id: Option<String>,
    pub error: Option<String>,
}

impl NotificationResult {
    pub fn delivered(message_id: impl Into<String>) -> Self {
        Self {
            success: true,
            message_id: Some(message_id.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message_id: None,
            error: Some(error.into()),
        }
    }
}

/// A way of presenting seat alerts to the user.
#[async_trait]
pub trait NotifierPlugin: Send + Sync {
    fn name(&self) -> &str;
    fn plugin_type(&self) -> &str;

    async fn notify(&self, alert: &SeatAlert) -> Result<NotificationResult>;

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }
}
