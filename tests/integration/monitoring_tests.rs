use super::*;
use seat_watcher::{
    commands::{Command, CommandReply},
    coordinator::{FlightState, EXTRACTION_TIMEOUT_MESSAGE},
    models::{LogType, NewCourse},
    CheckOutcome,
};

async fn add_course(monitor: &TestMonitor, code: &str, section: &str) -> anyhow::Result<()> {
    let reply = monitor
        .commands
        .send(Command::AddCourse {
            course: NewCourse::new(code, Some(section)),
        })
        .await?;
    assert!(matches!(reply, CommandReply::CourseAdded { .. }));
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_alert_only_on_transition_to_available() -> anyhow::Result<()> {
    let page = ScriptedPage::new(seat_page(&[("CSE115", "3", 0)]));
    let monitor = TestMonitor::in_memory(page).await?;
    add_course(&monitor, "cse115", "3").await?;

    let outcome = monitor.coordinator.run_check().await;
    assert!(matches!(outcome, CheckOutcome::Completed(ref summary) if summary.alerts.is_empty()));
    assert!(monitor.notifier.alerts().is_empty());

    monitor.page.set_html(seat_page(&[("CSE115", "3", 4)]));
    monitor.coordinator.run_check().await;
    let alerts = monitor.notifier.alerts();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].message, "Seats available for CSE115 (3).");
    assert_eq!(alerts[0].seats, Some(4));
    assert_eq!(alerts[0].check_url, TEST_URL);

    // Still open: no repeat alert.
    monitor.coordinator.run_check().await;
    assert_eq!(monitor.notifier.alerts().len(), 1);

    // Closed then reopened: alert again.
    monitor.page.set_html(seat_page(&[("CSE115", "3", 0)]));
    monitor.coordinator.run_check().await;
    monitor.page.set_html(seat_page(&[("CSE115", "3", 1)]));
    monitor.coordinator.run_check().await;
    assert_eq!(monitor.notifier.alerts().len(), 2);

    let snapshot = monitor.state.snapshot().await?;
    assert_eq!(snapshot.last_availability.get("CSE115|3"), Some(&true));
    assert!(snapshot.last_check.is_some());

    monitor.shutdown().await
}

#[tokio::test(flavor = "multi_thread")]
async fn test_check_logs_newest_first() -> anyhow::Result<()> {
    let page = ScriptedPage::new(seat_page(&[("MAT120", "4", 0)]));
    let monitor = TestMonitor::in_memory(page).await?;
    add_course(&monitor, "MAT120", "4").await?;
    add_course(&monitor, "BIO103", "1").await?;

    monitor.coordinator.run_check().await;

    assert_eq!(
        monitor.log_messages().await?,
        vec![
            "No seats for BIO103 (1).",
            "No seats for MAT120 (4).",
            "No seats found in monitored courses.",
            "Starting seat availability check...",
            "Added course BIO103 (1).",
            "Added course MAT120 (4).",
        ]
    );

    monitor.shutdown().await
}

#[tokio::test(flavor = "multi_thread")]
async fn test_overlapping_triggers_run_once() -> anyhow::Result<()> {
    let page = ScriptedPage::new(seat_page(&[("PHY107", "1", 2)]));
    page.set_delay(Some(Duration::from_millis(500)));
    let monitor = TestMonitor::in_memory(page).await?;
    add_course(&monitor, "PHY107", "1").await?;

    let coordinator = Arc::clone(&monitor.coordinator);
    let first = tokio::spawn(async move { coordinator.run_check().await });

    let coordinator = Arc::clone(&monitor.coordinator);
    assert!(
        wait_for_condition(
            || {
                let coordinator = Arc::clone(&coordinator);
                async move { coordinator.flight_state() == FlightState::Running }
            },
            Duration::from_secs(2)
        )
        .await
    );

    assert_eq!(monitor.coordinator.run_check().await, CheckOutcome::AlreadyRunning);
    let reply = monitor.commands.send(Command::CheckNow).await?;
    assert_eq!(reply, CommandReply::CheckScheduled);

    assert!(matches!(first.await?, CheckOutcome::Completed(_)));
    assert_eq!(monitor.page.created(), 1);
    assert_eq!(monitor.notifier.alerts().len(), 1);
    assert_eq!(monitor.coordinator.flight_state(), FlightState::Idle);

    monitor.shutdown().await
}

#[tokio::test(flavor = "multi_thread")]
async fn test_extraction_timeout_is_logged_and_context_released() -> anyhow::Result<()> {
    let page = ScriptedPage::new(seat_page(&[("CSE215", "2", 9)]));
    page.set_delay(Some(Duration::from_secs(3)));
    let monitor = TestMonitor::in_memory(page).await?;
    add_course(&monitor, "CSE215", "2").await?;

    let outcome = monitor.coordinator.run_check().await;
    assert!(matches!(outcome, CheckOutcome::Failed { .. }));

    let snapshot = monitor.state.snapshot().await?;
    let latest = snapshot.logs.latest().unwrap();
    assert_eq!(latest.kind, LogType::Error);
    assert_eq!(
        latest.message,
        format!("Error while checking seats: {}", EXTRACTION_TIMEOUT_MESSAGE)
    );
    assert_eq!(snapshot.logs.count_of(LogType::Error), 1);
    assert!(snapshot.last_check.is_none());

    assert_eq!(monitor.page.created(), 1);
    assert_eq!(monitor.page.destroyed(), 1);
    assert!(monitor.notifier.alerts().is_empty());

    // The guard is released, so the next trigger runs.
    monitor.page.set_delay(None);
    assert!(matches!(monitor.coordinator.run_check().await, CheckOutcome::Completed(_)));

    monitor.shutdown().await
}

#[tokio::test(flavor = "multi_thread")]
async fn test_check_now_command_runs_in_background() -> anyhow::Result<()> {
    let page = ScriptedPage::new(seat_page(&[("CSE115", "3", 5)]));
    let monitor = TestMonitor::in_memory(page).await?;
    add_course(&monitor, "CSE115", "3").await?;

    assert_eq!(monitor.commands.send(Command::CheckNow).await?, CommandReply::CheckScheduled);

    let notifier = monitor.notifier.clone();
    assert!(
        wait_for_condition(
            || {
                let notifier = notifier.clone();
                async move { notifier.alerts().len() == 1 }
            },
            Duration::from_secs(2)
        )
        .await
    );

    monitor.shutdown().await
}

#[tokio::test(flavor = "multi_thread")]
async fn test_start_and_stop_monitoring_commands() -> anyhow::Result<()> {
    let page = ScriptedPage::new(seat_page(&[]));
    let monitor = TestMonitor::in_memory(page).await?;

    let reply = monitor
        .commands
        .send(Command::StartMonitoring {
            interval_seconds: Some(120),
        })
        .await?;
    assert_eq!(reply, CommandReply::MonitoringStarted { interval_seconds: 120 });
    assert!(monitor.scheduler.is_armed().await);

    let snapshot = monitor.state.snapshot().await?;
    assert!(snapshot.monitoring);
    assert_eq!(snapshot.interval_seconds, 120);

    assert_eq!(
        monitor.commands.send(Command::StopMonitoring).await?,
        CommandReply::MonitoringStopped
    );
    assert!(!monitor.scheduler.is_armed().await);
    assert!(!monitor.state.snapshot().await?.monitoring);

    monitor.shutdown().await
}

#[tokio::test(flavor = "multi_thread")]
async fn test_removed_course_is_no_longer_checked() -> anyhow::Result<()> {
    let page = ScriptedPage::new(seat_page(&[("CSE115", "3", 5)]));
    let monitor = TestMonitor::in_memory(page).await?;
    add_course(&monitor, "CSE115", "3").await?;

    let reply = monitor
        .commands
        .send(Command::RemoveCourse {
            course_key: "CSE115|3".to_string(),
        })
        .await?;
    assert_eq!(
        reply,
        CommandReply::CourseRemoved {
            key: "CSE115|3".to_string(),
            existed: true
        }
    );

    assert_eq!(monitor.coordinator.run_check().await, CheckOutcome::NoCourses);
    assert_eq!(monitor.page.created(), 0);
    assert!(monitor.notifier.alerts().is_empty());

    monitor.shutdown().await
}
