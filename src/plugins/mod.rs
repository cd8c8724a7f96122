pub mod manager;
pub mod notifiers;
pub mod renderers;
pub mod traits;

pub use manager::{AlertReport, PluginManager};
pub use traits::{
    ExtractionRequest, ExtractionResponse, NotificationResult, NotifierPlugin, RenderingContext,
    RenderingContextProvider, SeatAlert,
};
