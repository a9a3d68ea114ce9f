//! lbai-studio - LyricBeats AI generation service
//!
//! Accepts song requests over HTTP and runs each one through the
//! instrumental → vocals → mix → video → publish pipeline in the background.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lbai_common::config::{default_config_path, load_toml_or_default};
use lbai_common::events::EventBus;
use lbai_studio::config::{CliOverrides, StudioConfig, StudioToml, MODULE_NAME};
use lbai_studio::services::{FfmpegClient, JobOrchestrator, MediaTools, Providers};
use lbai_studio::AppState;

/// Command-line arguments for lbai-studio
#[derive(Parser, Debug)]
#[command(name = "lbai-studio")]
#[command(about = "LyricBeats AI song and video generation service")]
#[command(version)]
struct Args {
    /// Port to listen on (overrides PORT and the config file)
    #[arg(short, long)]
    port: Option<u16>,

    /// Root folder for outputs, samples and the database
    #[arg(short, long, env = "LBAI_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// Config file path
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Config file is read before tracing starts so it can set the level
    let config_path = args.config.clone().or_else(|| default_config_path(MODULE_NAME));
    let toml: StudioToml = load_toml_or_default(config_path.as_deref());

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| toml.logging.level.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting lbai-studio (LyricBeats AI generation service)");
    info!(
        "Version: {} (git {}, built {}, {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    if let Some(path) = &config_path {
        info!("Config file: {}", path.display());
    }

    let cli = CliOverrides {
        port: args.port,
        root_folder: args.root_folder,
        config_path: args.config,
    };
    let config = StudioConfig::from_sources(&cli, toml);

    // Root folder and its subdirectories
    config
        .paths
        .ensure_exists()
        .context("Failed to initialize root folder")?;
    info!("Root folder: {}", config.paths.root.display());

    info!("Database: {}", config.paths.database.display());
    let db_pool = lbai_studio::db::init_database_pool(&config.paths.database).await?;
    info!("Database connection established");

    let event_bus = EventBus::new(100);
    info!("Event bus initialized");

    match FfmpegClient::new(config.ffmpeg_path.clone()).check_available().await {
        Ok(version) => info!("ffmpeg: {}", version),
        Err(e) => warn!("ffmpeg not usable, jobs will fail at the mix stage: {}", e),
    }

    let providers = Providers::initialize(&config).await;
    let media = MediaTools::from_config(&config).context("Failed to initialize media tools")?;
    let orchestrator = Arc::new(JobOrchestrator::new(
        db_pool.clone(),
        event_bus.clone(),
        providers,
        media,
        config.paths.clone(),
        config.pipeline.clone(),
    ));

    let state = AppState::new(db_pool, event_bus, orchestrator);
    let app = lbai_studio::build_router(state);

    let addr = format!("{}:{}", config.bind_address, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
