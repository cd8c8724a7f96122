use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::commands::CommandSender;
use crate::scheduler::MonitorScheduler;
use crate::store::StateHandle;

pub mod handlers;
pub mod responses;

pub use handlers::{get_state, health_check, list_courses, list_logs, post_command, scheduler_info};
pub use responses::*;

#[derive(Clone)]
pub struct AppState {
    pub commands: CommandSender,
    pub state: StateHandle,
    pub scheduler: Arc<MonitorScheduler>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes())
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                        .on_response(DefaultOnResponse::new().level(Level::INFO)),
                )
                .layer(CompressionLayer::new())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        // Reads
        .route("/state", get(get_state))
        .route("/courses", get(list_courses))
        .route("/logs", get(list_logs))
        .route("/scheduler", get(scheduler_info))
        // Command channel
        .route("/commands", post(post_command))
}
