use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};

use seat_watcher::{
    commands::DEFAULT_QUEUE_DEPTH,
    config::StoreConfig,
    extraction,
    models::{Course, NewCourse},
    plugins::{renderers, PluginManager},
    store,
    utils::telemetry,
    web::{create_router, AppState},
    AppConfig, CheckCoordinator, CourseRegistry, MonitorScheduler, MonitorService, StateHandle,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to an extra configuration file, layered over config/*.toml
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the monitor and its HTTP command channel (default)
    Serve,
    /// Print the persisted monitor state as JSON
    Status,
    /// Run seat extraction against a saved page
    Extract {
        #[arg(long)]
        html: PathBuf,

        /// CODE or CODE:SECTION, repeatable
        #[arg(long = "course", required = true)]
        courses: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = AppConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    match args.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config).await,
        Commands::Status => status(config).await,
        Commands::Extract { html, courses } => extract(&html, &courses),
    }
}

async fn serve(config: AppConfig) -> Result<()> {
    let _log_guard = telemetry::init_tracing(&config.logging)?;
    info!("Starting Seat Watcher v{}", env!("CARGO_PKG_VERSION"));

    telemetry::install_metrics_exporter(&config.metrics)?;

    let state = open_state(&config).await?;
    let initial = state.initialize().await?;
    info!(
        courses = initial.courses.len(),
        monitoring = initial.monitoring,
        "Loaded monitor state"
    );

    let renderer = renderers::from_config(&config.renderer)?;
    let plugins = PluginManager::from_config(&config.notifications).await?;
    info!(notifiers = ?plugins.list_notifier_types().await, "Notifiers registered");

    let coordinator = Arc::new(CheckCoordinator::new(
        state.clone(),
        renderer,
        plugins.clone(),
        &config.monitor,
    ));
    let scheduler = Arc::new(MonitorScheduler::new(coordinator).await?);
    scheduler.resume().await?;

    let service = MonitorService::new(CourseRegistry::new(state.clone()), Arc::clone(&scheduler));
    let (commands, dispatcher) = service.spawn(DEFAULT_QUEUE_DEPTH);

    let app = create_router(AppState {
        commands,
        state,
        scheduler: Arc::clone(&scheduler),
    });

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Command channel listening on http://{}", addr);

    // The router owns the last CommandSender, so the dispatcher drains once
    // the server returns.
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;
    if let Err(e) = &served {
        error!("Server error: {}", e);
    }

    scheduler.shutdown().await?;
    plugins.shutdown().await?;
    if let Err(e) = dispatcher.await {
        error!("Command dispatcher panicked: {}", e);
    }

    info!("Seat Watcher stopped");
    served.map_err(Into::into)
}

async fn status(config: AppConfig) -> Result<()> {
    let state = open_state(&config).await?;
    let snapshot = state.snapshot().await?;
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

fn extract(html: &Path, courses: &[String]) -> Result<()> {
    let page = std::fs::read_to_string(html)
        .with_context(|| format!("Failed to read {}", html.display()))?;

    let courses = courses
        .iter()
        .map(|raw| parse_course(raw))
        .collect::<Result<Vec<_>>>()?;

    let results = extraction::extract_from_html(&courses, &page);
    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}

fn parse_course(raw: &str) -> Result<Course> {
    let (code, section) = match raw.split_once(':') {
        Some((code, section)) => (code, Some(section)),
        None => (raw, None),
    };
    Course::new(NewCourse::new(code, section)).with_context(|| format!("Invalid course '{}'", raw))
}

async fn open_state(config: &AppConfig) -> Result<StateHandle> {
    ensure_store_directory(&config.store)?;
    let store = store::connect(&config.store)
        .await
        .with_context(|| format!("Failed to open state store at {}", config.store.url))?;
    Ok(StateHandle::new(store, config.monitor.initial_state()))
}

fn ensure_store_directory(config: &StoreConfig) -> Result<()> {
    let Some(path) = config.url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    let path = path.split('?').next().unwrap_or(path);
    if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    info!("Shutdown signal received");
}
