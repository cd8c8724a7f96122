use crate::models::{Course, LogType, NewCourse};
use crate::store::StateHandle;
use crate::utils::error::{AppError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    Added(Course),
    Duplicate(String),
    Rejected(String),
}

/// The set of tracked courses. Duplicate and invalid input are reported on
/// the activity log, never as errors.
#[derive(Clone)]
pub struct CourseRegistry {
    state: StateHandle,
}

impl CourseRegistry {
    pub fn new(state: StateHandle) -> Self {
        Self { state }
    }

    pub async fn add(&self, new_course: NewCourse) -> Result<AddOutcome> {
        let course = match Course::new(new_course) {
            Ok(course) => course,
            Err(AppError::Validation(reason)) => {
                self.state
                    .append_log(format!("Invalid course: {}", reason), LogType::Warning)
                    .await?;
                return Ok(AddOutcome::Rejected(reason));
            }
            Err(e) => return Err(e),
        };

        if !self.state.add_course(course.clone()).await? {
            self.state
                .append_log(format!("Course {} already in list.", course.code), LogType::Warning)
                .await?;
            return Ok(AddOutcome::Duplicate(course.key));
        }

        self.state
            .append_log(format!("Added course {}.", course.label()), LogType::Success)
            .await?;
        Ok(AddOutcome::Added(course))
    }

    /// Removing an unknown key does nothing.
    pub async fn remove(&self, key: &str) -> Result<Option<Course>> {
        let removed = self.state.remove_course(key).await?;
        if removed.is_some() {
            self.state
                .append_log("Removed course from monitoring list.", LogType::Warning)
                .await?;
        }
        Ok(removed)
    }

    pub async fn list(&self) -> Result<Vec<Course>> {
        Ok(self.state.snapshot().await?.courses)
    }
}
