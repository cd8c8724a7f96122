use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use url::Url;

use crate::models::{Course, NewCourse, Theme};
use crate::registry::{AddOutcome, CourseRegistry};
use crate::scheduler::MonitorScheduler;
use crate::store::StateHandle;
use crate::utils::error::{AppError, Result};

pub const DEFAULT_QUEUE_DEPTH: usize = 64;

/// Everything the control surface can ask of the monitor, tagged by `action`
/// on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Command {
    AddCourse {
        course: NewCourse,
    },
    RemoveCourse {
        #[serde(rename = "courseKey")]
        course_key: String,
    },
    StartMonitoring {
        #[serde(default, rename = "intervalSeconds")]
        interval_seconds: Option<u64>,
    },
    StopMonitoring,
    CheckNow,
    SetTheme {
        theme: Theme,
    },
    SetCheckUrl {
        #[serde(rename = "checkUrl")]
        check_url: String,
    },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::AddCourse { .. } => "addCourse",
            Command::RemoveCourse { .. } => "removeCourse",
            Command::StartMonitoring { .. } => "startMonitoring",
            Command::StopMonitoring => "stopMonitoring",
            Command::CheckNow => "checkNow",
            Command::SetTheme { .. } => "setTheme",
            Command::SetCheckUrl { .. } => "setCheckUrl",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum CommandReply {
    CourseAdded {
        course: Course,
    },
    CourseDuplicate {
        key: String,
    },
    CourseRejected {
        reason: String,
    },
    CourseRemoved {
        key: String,
        existed: bool,
    },
    MonitoringStarted {
        #[serde(rename = "intervalSeconds")]
        interval_seconds: u64,
    },
    MonitoringStopped,
    CheckScheduled,
    ThemeUpdated {
        theme: Theme,
    },
    CheckUrlUpdated {
        #[serde(rename = "checkUrl")]
        check_url: String,
    },
}

pub struct CommandEnvelope {
    pub command: Command,
    pub reply: oneshot::Sender<Result<CommandReply>>,
}

/// Handles one command at a time. Long-running checks are spawned so a
/// slow page never holds up the queue.
#[derive(Clone)]
pub struct MonitorService {
    registry: CourseRegistry,
    scheduler: Arc<MonitorScheduler>,
}

impl MonitorService {
    pub fn new(registry: CourseRegistry, scheduler: Arc<MonitorScheduler>) -> Self {
        Self { registry, scheduler }
    }

    pub fn scheduler(&self) -> &Arc<MonitorScheduler> {
        &self.scheduler
    }

    pub fn state(&self) -> &StateHandle {
        self.scheduler.coordinator().state()
    }

    pub async fn dispatch(&self, command: Command) -> Result<CommandReply> {
        tracing::debug!(action = command.name(), "Dispatching command");

        match command {
            Command::AddCourse { course } => Ok(match self.registry.add(course).await? {
                AddOutcome::Added(course) => CommandReply::CourseAdded { course },
                AddOutcome::Duplicate(key) => CommandReply::CourseDuplicate { key },
                AddOutcome::Rejected(reason) => CommandReply::CourseRejected { reason },
            }),
            Command::RemoveCourse { course_key } => {
                let removed = self.registry.remove(&course_key).await?;
                Ok(CommandReply::CourseRemoved {
                    key: course_key,
                    existed: removed.is_some(),
                })
            }
            Command::StartMonitoring { interval_seconds } => {
                let interval_seconds = self.scheduler.enable(interval_seconds).await?;
                self.spawn_check();
                Ok(CommandReply::MonitoringStarted { interval_seconds })
            }
            Command::StopMonitoring => {
                self.scheduler.stop().await?;
                Ok(CommandReply::MonitoringStopped)
            }
            Command::CheckNow => {
                self.spawn_check();
                Ok(CommandReply::CheckScheduled)
            }
            Command::SetTheme { theme } => {
                self.state().set_theme(theme).await?;
                Ok(CommandReply::ThemeUpdated { theme })
            }
            Command::SetCheckUrl { check_url } => {
                let check_url = validate_check_url(&check_url)?;
                self.state().set_check_url(check_url.clone()).await?;
                Ok(CommandReply::CheckUrlUpdated { check_url })
            }
        }
    }

    fn spawn_check(&self) -> JoinHandle<()> {
        let coordinator = Arc::clone(self.scheduler.coordinator());
        tokio::spawn(async move {
            let outcome = coordinator.run_check().await;
            tracing::debug!(outcome = outcome.label(), "Triggered check finished");
        })
    }

    /// Starts the dispatcher task. It runs until every [`CommandSender`] is
    /// dropped.
    pub fn spawn(self, queue_depth: usize) -> (CommandSender, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<CommandEnvelope>(queue_depth);

        let handle = tokio::spawn(async move {
            while let Some(CommandEnvelope { command, reply }) = rx.recv().await {
                let action = command.name();
                let result = self.dispatch(command).await;
                if let Err(e) = &result {
                    tracing::warn!(action, error = %e, "Command failed");
                }
                if reply.send(result).is_err() {
                    tracing::debug!(action, "Command caller went away before the reply");
                }
            }
            tracing::info!("Command dispatcher stopped");
        });

        (CommandSender { tx }, handle)
    }
}

fn validate_check_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    match Url::parse(trimmed) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(trimmed.to_string()),
        _ => Err(AppError::Validation(format!("Invalid check URL: {}", raw))),
    }
}

/// Cloneable handle onto the dispatcher queue.
#[derive(Clone)]
pub struct CommandSender {
    tx: mpsc::Sender<CommandEnvelope>,
}

impl CommandSender {
    pub async fn send(&self, command: Command) -> Result<CommandReply> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(CommandEnvelope { command, reply })
            .await
            .map_err(|_| AppError::Internal("Command dispatcher is not running".to_string()))?;

        response
            .await
            .map_err(|_| AppError::Internal("Command dispatcher dropped the reply".to_string()))?
    }
}
