use super::*;
use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use seat_watcher::web::create_router;

async fn request(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> anyhow::Result<(StatusCode, Value)> {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = app.clone().oneshot(builder.body(body)?).await?;
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    Ok((status, value))
}

async fn test_app() -> anyhow::Result<(TestMonitor, Router)> {
    let page = ScriptedPage::new(seat_page(&[("CSE115", "3", 0)]));
    let monitor = TestMonitor::in_memory(page).await?;
    let app = create_router(monitor.app_state());
    Ok((monitor, app))
}

#[tokio::test(flavor = "multi_thread")]
async fn test_health_check() -> anyhow::Result<()> {
    let (monitor, app) = test_app().await?;

    let (status, body) = request(&app, Method::GET, "/health", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "seat-watcher");

    monitor.shutdown().await
}

#[tokio::test(flavor = "multi_thread")]
async fn test_add_course_then_list() -> anyhow::Result<()> {
    let (monitor, app) = test_app().await?;

    let (status, body) = request(
        &app,
        Method::POST,
        "/api/v1/commands",
        Some(json!({"action": "addCourse", "course": {"code": "cse115", "section": "3"}})),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "courseAdded");
    assert_eq!(body["data"]["course"]["key"], "CSE115|3");

    let (status, body) = request(
        &app,
        Method::POST,
        "/api/v1/commands",
        Some(json!({"action": "addCourse", "course": {"code": "CSE115", "section": "3"}})),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "courseDuplicate");

    let (status, body) = request(&app, Method::GET, "/api/v1/courses", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().map(Vec::len), Some(1));

    let (_, body) = request(&app, Method::GET, "/api/v1/logs", None).await?;
    let entries = body["data"].as_array().cloned().unwrap_or_default();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["message"], "Course CSE115 already in list.");
    assert_eq!(entries[0]["type"], "warning");
    assert_eq!(entries[1]["message"], "Added course CSE115 (3).");
    assert_eq!(entries[1]["type"], "success");

    monitor.shutdown().await
}

#[tokio::test(flavor = "multi_thread")]
async fn test_state_reports_revision() -> anyhow::Result<()> {
    let (monitor, app) = test_app().await?;

    let (status, body) = request(&app, Method::GET, "/api/v1/state", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["checkUrl"], TEST_URL);
    assert_eq!(body["data"]["intervalSeconds"], 30);
    assert_eq!(body["data"]["monitoring"], false);
    assert_eq!(body["meta"]["revision"], monitor.state.revision());

    monitor.shutdown().await
}

#[tokio::test(flavor = "multi_thread")]
async fn test_start_monitoring_over_http() -> anyhow::Result<()> {
    let (monitor, app) = test_app().await?;

    let (status, body) = request(
        &app,
        Method::POST,
        "/api/v1/commands",
        Some(json!({"action": "startMonitoring", "intervalSeconds": 45})),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!({"status": "monitoringStarted", "intervalSeconds": 45}));

    let (status, body) = request(&app, Method::GET, "/api/v1/scheduler", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["armed"], true);
    assert_eq!(body["data"]["intervalSeconds"], 45);

    monitor.shutdown().await
}

#[tokio::test(flavor = "multi_thread")]
async fn test_invalid_check_url_is_bad_request() -> anyhow::Result<()> {
    let (monitor, app) = test_app().await?;

    let (status, body) = request(
        &app,
        Method::POST,
        "/api/v1/commands",
        Some(json!({"action": "setCheckUrl", "checkUrl": "not a url"})),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");

    monitor.shutdown().await
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unknown_action_is_rejected() -> anyhow::Result<()> {
    let (monitor, app) = test_app().await?;

    let (status, _) = request(
        &app,
        Method::POST,
        "/api/v1/commands",
        Some(json!({"action": "formatDisk"})),
    )
    .await?;
    assert!(status.is_client_error());

    monitor.shutdown().await
}
