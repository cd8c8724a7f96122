use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::{CheckResult, Course};
use crate::utils::error::Result;

/// The only action a rendering context understands.
pub const CHECK_SEATS: &str = "checkSeats";

/// Message sent to a rendering context asking it to extract seat counts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionRequest {
    pub action: String,
    pub courses: Vec<Course>,
}

impl ExtractionRequest {
    pub fn check_seats(courses: Vec<Course>) -> Self {
        Self {
            action: CHECK_SEATS.to_string(),
            courses,
        }
    }

    pub fn is_check_seats(&self) -> bool {
        self.action == CHECK_SEATS
    }
}

/// Reply from a rendering context. `error` takes precedence over `results`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<CheckResult>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl ExtractionResponse {
    pub fn success(results: Vec<CheckResult>, url: Option<String>) -> Self {
        Self {
            results: Some(results),
            error: None,
            url,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn unsupported(action: &str) -> Self {
        Self::failure(format!("Unsupported action: {}", action))
    }

    /// A response with neither field set (or an empty error) counts as an
    /// empty result set.
    pub fn into_outcome(self) -> std::result::Result<Vec<CheckResult>, String> {
        match self.error.filter(|error| !error.is_empty()) {
            Some(error) => Err(error),
            None => Ok(self.results.unwrap_or_default()),
        }
    }
}

/// One short-lived page, owned by a single check cycle.
#[async_trait]
pub trait RenderingContext: Send {
    fn id(&self) -> &str;

    /// Resolves once the page content has fully loaded.
    async fn wait_until_ready(&mut self) -> Result<()>;

    /// `Ok(None)` means the context produced no reply at all.
    async fn send(&mut self, request: &ExtractionRequest) -> Result<Option<ExtractionResponse>>;

    async fn destroy(self: Box<Self>) -> Result<()>;
}

#[async_trait]
pub trait RenderingContextProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn create(&self, url: &str) -> Result<Box<dyn RenderingContext>>;
}
