use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::utils::error::{AppError, Result};

/// A tracked course section. `key` is the identity used everywhere else.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Course {
    #[serde(default)]
    pub key: String,
    pub code: String,
    #[serde(default)]
    pub section: String,
}

/// Course as submitted on the command channel, before normalization.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct NewCourse {
    #[validate(length(min = 1, message = "course code is required"))]
    pub code: String,
    #[serde(default)]
    pub section: Option<String>,
}

impl NewCourse {
    pub fn new(code: impl Into<String>, section: Option<&str>) -> Self {
        Self {
            code: code.into(),
            section: section.map(str::to_string),
        }
    }
}

impl Course {
    pub fn new(new_course: NewCourse) -> Result<Self> {
        new_course.validate()?;

        let code = new_course.code.trim().to_uppercase();
        if code.is_empty() {
            return Err(AppError::Validation("course code is required".to_string()));
        }
        let section = new_course
            .section
            .as_deref()
            .map(|s| s.trim().to_uppercase())
            .unwrap_or_default();

        Ok(Self {
            key: Self::make_key(&code, &section),
            code,
            section,
        })
    }

    pub fn make_key(code: &str, section: &str) -> String {
        format!("{}|{}", code, section)
    }

    /// Key as stored, or derived from code/section for courses that arrived
    /// without one.
    pub fn identity(&self) -> String {
        if self.key.is_empty() {
            Self::make_key(&self.code, &self.section)
        } else {
            self.key.clone()
        }
    }

    pub fn label(&self) -> String {
        if self.section.is_empty() {
            self.code.clone()
        } else {
            format!("{} ({})", self.code, self.section)
        }
    }
}
