use super::*;
use serde_json::json;
use tempfile::TempDir;

use seat_watcher::{
    commands::{Command, CommandReply},
    config::StoreConfig,
    models::{NewCourse, Theme},
    store::SqliteStore,
};

async fn sqlite_store(dir: &TempDir) -> anyhow::Result<Arc<dyn StateStore>> {
    let config = StoreConfig {
        url: format!("sqlite://{}", dir.path().join("state.db").display()),
        max_connections: 2,
        min_connections: 1,
        acquire_timeout: 5,
    };
    Ok(Arc::new(SqliteStore::connect(&config).await?))
}

#[tokio::test(flavor = "multi_thread")]
async fn test_restart_resumes_monitoring() -> anyhow::Result<()> {
    let dir = TempDir::new()?;

    let store = sqlite_store(&dir).await?;
    let first = TestMonitor::start(store, ScriptedPage::new(seat_page(&[]))).await?;
    first
        .commands
        .send(Command::AddCourse {
            course: NewCourse::new("CSE115", Some("3")),
        })
        .await?;
    first
        .commands
        .send(Command::StartMonitoring {
            interval_seconds: Some(75),
        })
        .await?;
    first.commands.send(Command::SetTheme { theme: Theme::Dark }).await?;
    first.shutdown().await?;

    let store = sqlite_store(&dir).await?;
    let restarted = TestMonitor::start(store, ScriptedPage::new(seat_page(&[]))).await?;
    let info = restarted.scheduler.schedule_info().await;
    assert!(info.armed);
    assert_eq!(info.interval_seconds, Some(75));

    let snapshot = restarted.state.snapshot().await?;
    assert!(snapshot.monitoring);
    assert_eq!(snapshot.theme, Theme::Dark);
    assert_eq!(snapshot.courses.len(), 1);
    assert_eq!(snapshot.courses[0].key, "CSE115|3");

    // Resuming only re-arms the timer.
    assert_eq!(restarted.page.created(), 0);

    restarted.shutdown().await
}

#[tokio::test(flavor = "multi_thread")]
async fn test_stopped_monitor_stays_stopped_after_restart() -> anyhow::Result<()> {
    let dir = TempDir::new()?;

    let store = sqlite_store(&dir).await?;
    let first = TestMonitor::start(store, ScriptedPage::new(seat_page(&[]))).await?;
    first.commands.send(Command::StartMonitoring { interval_seconds: None }).await?;
    first.commands.send(Command::StopMonitoring).await?;
    first.shutdown().await?;

    let store = sqlite_store(&dir).await?;
    let restarted = TestMonitor::start(store, ScriptedPage::new(seat_page(&[]))).await?;
    assert!(!restarted.scheduler.is_armed().await);

    restarted.shutdown().await
}

#[tokio::test(flavor = "multi_thread")]
async fn test_legacy_interval_minutes_migrated_on_start() -> anyhow::Result<()> {
    let store = Arc::new(MemoryStore::seeded([
        ("intervalMinutes".to_string(), json!(2)),
        ("monitoring".to_string(), json!(true)),
    ]));

    let monitor = TestMonitor::start(store.clone(), ScriptedPage::new(seat_page(&[]))).await?;

    assert_eq!(store.raw("intervalSeconds").await, Some(json!(120)));
    assert_eq!(store.raw("intervalMinutes").await, None);
    assert_eq!(monitor.scheduler.schedule_info().await.interval_seconds, Some(120));

    monitor.shutdown().await
}

#[tokio::test(flavor = "multi_thread")]
async fn test_set_check_url_is_persisted_and_validated() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let store = sqlite_store(&dir).await?;
    let monitor = TestMonitor::start(store, ScriptedPage::new(seat_page(&[]))).await?;

    let reply = monitor
        .commands
        .send(Command::SetCheckUrl {
            check_url: "https://registrar.example.edu/fall".to_string(),
        })
        .await?;
    assert_eq!(
        reply,
        CommandReply::CheckUrlUpdated {
            check_url: "https://registrar.example.edu/fall".to_string()
        }
    );

    let rejected = monitor
        .commands
        .send(Command::SetCheckUrl {
            check_url: "file:///etc/passwd".to_string(),
        })
        .await;
    assert!(rejected.is_err());

    let reopened = StateHandle::new(sqlite_store(&dir).await?, MonitorState::new(TEST_URL, 30));
    assert_eq!(reopened.snapshot().await?.check_url, "https://registrar.example.edu/fall");

    monitor.shutdown().await
}
