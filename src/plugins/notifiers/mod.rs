pub mod discord;
pub mod email;
pub mod log;

pub use discord::DiscordNotifier;
pub use email::EmailNotifier;
pub use log::LogNotifier;
