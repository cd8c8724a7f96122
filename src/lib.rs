pub mod commands;
pub mod config;
pub mod coordinator;
pub mod extraction;
pub mod models;
pub mod plugins;
pub mod registry;
pub mod scheduler;
pub mod store;
pub mod utils;
pub mod web;

// Re-export commonly used types
pub use commands::{Command, CommandReply, CommandSender, MonitorService};
pub use config::AppConfig;
pub use coordinator::{CheckCoordinator, CheckOutcome};
pub use registry::CourseRegistry;
pub use scheduler::MonitorScheduler;
pub use store::StateHandle;
pub use utils::error::AppError;

pub type Result<T> = std::result::Result<T, AppError>;
