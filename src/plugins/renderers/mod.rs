pub mod chrome;
pub mod http;

pub use chrome::ChromeRenderer;
pub use http::HttpRenderer;

use std::sync::Arc;

use crate::config::{RendererBackend, RendererConfig};
use crate::plugins::traits::RenderingContextProvider;
use crate::utils::error::Result;

pub fn from_config(config: &RendererConfig) -> Result<Arc<dyn RenderingContextProvider>> {
    let provider: Arc<dyn RenderingContextProvider> = match config.backend {
        RendererBackend::Chrome => Arc::new(ChromeRenderer::new(config.clone())),
        RendererBackend::Http => Arc::new(HttpRenderer::new(config)?),
    };
    tracing::info!(renderer = provider.name(), "Rendering context provider configured");
    Ok(provider)
}
