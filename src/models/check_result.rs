use serde::{Deserialize, Serialize};

use crate::models::Course;

pub const NOTE_PARSED: &str = "Parsed from page.";
pub const NOTE_NOT_FOUND: &str = "Course not found on page.";
pub const NOTE_UNPARSEABLE: &str = "Unable to parse seat count.";

/// Outcome of looking up one course on the rendered page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckResult {
    pub key: String,
    pub label: String,
    pub available: bool,
    pub seats: Option<u32>,
    pub note: String,
}

impl CheckResult {
    pub fn not_found(course: &Course) -> Self {
        Self {
            key: course.identity(),
            label: course.label(),
            available: false,
            seats: None,
            note: NOTE_NOT_FOUND.to_string(),
        }
    }

    pub fn from_seats(course: &Course, seats: Option<u32>) -> Self {
        let note = match seats {
            Some(_) => NOTE_PARSED,
            None => NOTE_UNPARSEABLE,
        };

        Self {
            key: course.identity(),
            label: course.label(),
            available: seats.is_some_and(|count| count > 0),
            seats,
            note: note.to_string(),
        }
    }
}
