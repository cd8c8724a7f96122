use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;
use url::Url;

use crate::models::{DEFAULT_INTERVAL_SECONDS, MonitorState};

pub const DEFAULT_CHECK_URL: &str = "https://rds3.northsouth.edu/";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub monitor: MonitorConfig,
    pub renderer: RendererConfig,
    pub notifications: NotificationsConfig,
    pub metrics: MetricsConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    pub check_url: String,
    pub default_interval_seconds: u64,
    pub extraction_timeout_secs: u64,
    pub ready_timeout_secs: u64,
    pub alert_timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RendererBackend {
    Chrome,
    Http,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RendererConfig {
    pub backend: RendererBackend,
    pub chrome_path: Option<String>,
    pub user_agent: String,
    pub request_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    pub log_alerts: bool,
    pub smtp: SmtpConfig,
    pub discord: DiscordConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    pub host: Option<String>,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from_address: Option<String>,
    pub from_name: String,
    pub to_address: Option<String>,
    pub use_tls: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    pub webhook_url: Option<String>,
    pub username: String,
    pub avatar_url: Option<String>,
    pub retry_attempts: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub filter: String,
    pub directory: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://data/seat-watcher.db".to_string(),
            max_connections: 4,
            min_connections: 1,
            acquire_timeout: 30,
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            check_url: DEFAULT_CHECK_URL.to_string(),
            default_interval_seconds: DEFAULT_INTERVAL_SECONDS,
            extraction_timeout_secs: 15,
            ready_timeout_secs: 30,
            alert_timeout_secs: 10,
        }
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            backend: RendererBackend::Chrome,
            chrome_path: None,
            user_agent: format!("SeatWatcher/{}", env!("CARGO_PKG_VERSION")),
            request_timeout: 30,
        }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            log_alerts: true,
            smtp: SmtpConfig {
                host: None,
                port: 587,
                username: None,
                password: None,
                from_address: None,
                from_name: "Seat Watcher".to_string(),
                to_address: None,
                use_tls: true,
            },
            discord: DiscordConfig {
                webhook_url: None,
                username: "Seat Watcher".to_string(),
                avatar_url: None,
                retry_attempts: 3,
            },
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: 9001,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "seat_watcher=info,tower_http=info".to_string(),
            directory: None,
        }
    }
}

impl MonitorConfig {
    pub fn extraction_timeout(&self) -> Duration {
        Duration::from_secs(self.extraction_timeout_secs)
    }

    pub fn ready_timeout(&self) -> Duration {
        Duration::from_secs(self.ready_timeout_secs)
    }

    pub fn alert_timeout(&self) -> Duration {
        Duration::from_secs(self.alert_timeout_secs)
    }

    /// State written on first run.
    pub fn initial_state(&self) -> MonitorState {
        MonitorState::new(self.check_url.clone(), self.default_interval_seconds)
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    /// Layers built-in defaults, `config/*.toml`, an optional explicit file
    /// and `SEAT_WATCHER__*` environment variables.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let mut builder = Config::builder()
            .add_source(Config::try_from(&AppConfig::default())?)
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            .add_source(File::with_name("config/local").required(false));

        if let Some(path) = explicit {
            builder = builder.add_source(File::from(path).required(true));
        }

        let s = builder
            .add_source(Environment::with_prefix("SEAT_WATCHER").separator("__"))
            .build()?;

        let mut config: AppConfig = s.try_deserialize()?;

        if config.renderer.chrome_path.is_none() {
            config.renderer.chrome_path = env::var("CHROME_PATH").ok();
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Message("Server port must be greater than 0".into()));
        }

        if self.store.max_connections == 0 {
            return Err(ConfigError::Message(
                "Store max_connections must be greater than 0".into(),
            ));
        }

        if self.store.min_connections > self.store.max_connections {
            return Err(ConfigError::Message(
                "Store min_connections cannot exceed max_connections".into(),
            ));
        }

        match Url::parse(&self.monitor.check_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            _ => {
                return Err(ConfigError::Message(
                    "Invalid check_url: expected an http(s) URL".into(),
                ))
            }
        }

        if self.monitor.default_interval_seconds == 0 {
            return Err(ConfigError::Message(
                "Monitor default_interval_seconds must be at least 1".into(),
            ));
        }

        let monitor = &self.monitor;
        if monitor.extraction_timeout_secs == 0
            || monitor.ready_timeout_secs == 0
            || monitor.alert_timeout_secs == 0
        {
            return Err(ConfigError::Message("Monitor timeouts must be greater than 0".into()));
        }

        if self.renderer.request_timeout == 0 {
            return Err(ConfigError::Message(
                "Renderer request_timeout must be greater than 0".into(),
            ));
        }

        if let Some(webhook) = &self.notifications.discord.webhook_url {
            if !webhook.starts_with("https://discord.com/api/webhooks/") {
                return Err(ConfigError::Message("Invalid Discord webhook URL format".into()));
            }
        }

        let smtp = &self.notifications.smtp;
        if smtp.host.is_some() && smtp.to_address.is_none() {
            return Err(ConfigError::Message("SMTP to_address is required when host is set".into()));
        }

        if smtp.port == 0 {
            return Err(ConfigError::Message("SMTP port must be greater than 0".into()));
        }

        if self.metrics.port == 0 {
            return Err(ConfigError::Message("Metrics port must be greater than 0".into()));
        }

        Ok(())
    }
}
