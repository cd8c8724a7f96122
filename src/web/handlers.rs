use axum::{extract::State, response::Json};
use serde_json::json;

use crate::commands::{Command, CommandReply};
use crate::models::{Course, LogEntry, MonitorState};
use crate::scheduler::ScheduleInfo;
use super::{ApiResponse, AppState, HttpError};

pub async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now(),
        "version": env!("CARGO_PKG_VERSION"),
        "service": "seat-watcher"
    }))
}

pub async fn get_state(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<MonitorState>>, HttpError> {
    let snapshot = state.state.snapshot().await?;
    let meta = json!({ "revision": state.state.revision() });
    Ok(Json(ApiResponse::success_with_meta(snapshot, meta)))
}

pub async fn list_courses(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<Course>>>, HttpError> {
    let snapshot = state.state.snapshot().await?;
    Ok(Json(ApiResponse::success(snapshot.courses)))
}

/// Newest first.
pub async fn list_logs(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<LogEntry>>>, HttpError> {
    let snapshot = state.state.snapshot().await?;
    Ok(Json(ApiResponse::success(snapshot.logs.entries().to_vec())))
}

pub async fn scheduler_info(State(state): State<AppState>) -> Json<ApiResponse<ScheduleInfo>> {
    Json(ApiResponse::success(state.scheduler.schedule_info().await))
}

pub async fn post_command(
    State(state): State<AppState>,
    Json(command): Json<Command>,
) -> Result<Json<ApiResponse<CommandReply>>, HttpError> {
    tracing::info!(action = command.name(), "Command received over HTTP");
    let reply = state.commands.send(command).await?;
    Ok(Json(ApiResponse::success(reply)))
}
