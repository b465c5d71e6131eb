//! triage-server - respiratory pre-screening service
//!
//! Runs the symptom interview API, fuses symptom and imaging risk, stores
//! every screening locally, and syncs records to the remote store in the
//! background whenever the network allows.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use triage_common::config::{RootFolderInitializer, TomlConfig};
use triage_server::config::{CliOverrides, ServiceConfig};
use triage_server::interview::SymptomGraph;
use triage_server::sync::{ReconcilerSettings, SyncReconciler};
use triage_server::{AppState, CollaboratorTimeouts};

/// Command-line arguments for triage-server
#[derive(Parser, Debug)]
#[command(name = "triage-server")]
#[command(about = "Respiratory pre-screening triage service")]
#[command(version)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "TRIAGE_CONFIG")]
    config: Option<PathBuf>,

    /// Folder holding the local database
    #[arg(short, long, env = "TRIAGE_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// Address to bind
    #[arg(long, env = "TRIAGE_HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "TRIAGE_PORT")]
    port: Option<u16>,

    /// Device identifier stamped on records
    #[arg(long, env = "TRIAGE_DEVICE_ID")]
    device_id: Option<String>,

    /// Remote record store base URL
    #[arg(long, env = "TRIAGE_SYNC_REMOTE_URL")]
    remote_url: Option<String>,

    /// Log level when RUST_LOG is unset
    #[arg(long, env = "TRIAGE_LOG_LEVEL")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let toml_config = TomlConfig::load(args.config.as_deref(), "triage-server")
        .context("Failed to load configuration")?;
    let fallback_level = args
        .log_level
        .clone()
        .unwrap_or_else(|| toml_config.logging.level.clone());

    // RUST_LOG wins over the configured level
    let default_filter = format!(
        "triage_server={0},triage_common={0},tower_http=info",
        fallback_level
    );
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting triage-server v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let config = ServiceConfig::resolve(
        toml_config,
        CliOverrides {
            root_folder: args.root_folder,
            host: args.host,
            port: args.port,
            device_id: args.device_id,
            remote_url: args.remote_url,
            log_level: args.log_level,
        },
    )
    .context("Invalid configuration")?;

    // Refuse to serve a broken interview
    let graph = SymptomGraph::standard();
    let summary = graph.validate().context("Interview graph failed validation")?;
    info!(
        nodes = summary.node_count,
        options = summary.option_count,
        max_depth = summary.max_depth,
        "Interview graph validated"
    );

    let initializer = RootFolderInitializer::new(config.root_folder.clone());
    initializer
        .ensure_directory_exists()
        .context("Failed to initialize root folder")?;
    let db_path = initializer.database_path();
    info!("Database: {}", db_path.display());

    let db = triage_common::db::init_database(&db_path)
        .await
        .context("Failed to open database")?;
    let device_id = triage_common::db::resolve_device_id(&db, config.device_id.as_deref())
        .await
        .context("Failed to resolve device id")?;
    info!(%device_id, "Device identity");

    let (probe, remote) =
        triage_server::sync::connect(&config.sync).context("Failed to build sync clients")?;
    if config.sync.remote_url.is_none() {
        info!("No remote store configured, records stay on this device");
    }
    let reconciler = Arc::new(SyncReconciler::new(
        db.clone(),
        probe,
        remote,
        ReconcilerSettings::from(&config.sync),
        &device_id,
    ));

    let (imaging, converse) = triage_server::services::connect(&config.collaborators)
        .context("Failed to build collaborator clients")?;
    info!(
        imaging = imaging.is_some(),
        converse = converse.is_some(),
        "External collaborators"
    );

    let state = AppState::new(db.clone(), graph, reconciler.clone(), device_id)
        .with_imaging(imaging)
        .with_converse(converse)
        .with_timeouts(CollaboratorTimeouts {
            turn_secs: config.collaborators.turn_timeout_secs,
            summary_secs: config.collaborators.summary_timeout_secs,
        });

    let cancel = CancellationToken::new();
    let sync_task = reconciler.spawn(cancel.clone());

    let app = triage_server::build_router(state);
    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    cancel.cancel();
    if let Err(e) = sync_task.await {
        tracing::warn!(error = %e, "Sync task ended abnormally");
    }
    db.close().await;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
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
