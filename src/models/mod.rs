use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod check_result;
pub mod course;
pub mod log_entry;
pub mod monitor_state;

// Re-exports for convenience
pub use check_result::*;
pub use course::*;
pub use log_entry::*;
pub use monitor_state::*;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

/// Strips every whitespace character and upper-cases the rest.
///
/// Used when comparing user input against page text, where cells such as
/// `"CSE 115"` and `"cse115"` must compare equal.
pub fn compact_upper(value: &str) -> String {
    value
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_uppercase)
        .collect()
}

pub fn generate_id() -> String {
    Uuid::new_v4().simple().to_string()
}
