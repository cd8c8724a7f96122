use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LoggingConfig, MetricsConfig};
use crate::utils::error::{AppError, Result};

pub const CHECKS_TOTAL: &str = "seat_watcher_checks_total";
pub const ALERTS_TOTAL: &str = "seat_watcher_alerts_total";
pub const CHECK_DURATION_SECONDS: &str = "seat_watcher_check_duration_seconds";

/// Installs the global subscriber. `RUST_LOG` wins over the configured
/// filter. When a log directory is configured, a daily-rotated JSON file is
/// written alongside stdout and the returned guard must be held until exit.
pub fn init_tracing(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.filter))
        .map_err(|e| AppError::Internal(format!("Invalid log filter: {}", e)))?;

    let stdout_layer = fmt::layer().with_writer(std::io::stdout);

    let (file_layer, guard) = match &config.directory {
        Some(directory) => {
            let (writer, guard) =
                tracing_appender::non_blocking(rolling::daily(directory, "seat-watcher.log"));
            let layer = fmt::layer().with_writer(writer).with_ansi(false).json();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .try_init()
        .map_err(|e| AppError::Internal(format!("Failed to install tracing subscriber: {}", e)))?;

    Ok(guard)
}

/// Starts the Prometheus scrape endpoint when metrics are enabled.
/// Must be called from within the tokio runtime.
pub fn install_metrics_exporter(config: &MetricsConfig) -> Result<()> {
    if !config.enabled {
        return Ok(());
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| AppError::Internal(format!("Failed to start metrics exporter: {}", e)))?;

    tracing::info!(%addr, "Prometheus metrics exporter listening");
    Ok(())
}
