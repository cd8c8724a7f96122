pub mod notifier;
pub mod renderer;

pub use notifier::{NotificationResult, NotifierPlugin, SeatAlert};
pub use renderer::{
    ExtractionRequest, ExtractionResponse, RenderingContext, RenderingContextProvider, CHECK_SEATS,
};
