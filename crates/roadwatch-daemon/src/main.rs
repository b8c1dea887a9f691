//! roadwatch-daemon - road hazard and repair workflow API server.
//!
//! Uses a synchronous `fn main()` that parses arguments and loads the
//! configuration before the Tokio runtime exists, so configuration errors
//! are reported without spinning up worker threads.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use roadwatch_core::config::RoadwatchConfig;
use roadwatch_core::store::SqliteStore;
use roadwatch_daemon::api;
use roadwatch_daemon::state::AppState;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// roadwatch daemon
#[derive(Parser, Debug)]
#[command(name = "roadwatch-daemon")]
#[command(about = "Serves the roadwatch hazard map and repair workflow API")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on (overrides `daemon.listen_addr`)
    #[arg(long)]
    listen: Option<SocketAddr>,

    /// Path to `SQLite` database file (overrides `daemon.database_path`)
    #[arg(long)]
    database: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log to file instead of stdout
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => RoadwatchConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => RoadwatchConfig::default(),
    };
    if let Some(listen) = args.listen {
        config.daemon.listen_addr = listen;
    }
    if let Some(database) = &args.database {
        config.daemon.database_path.clone_from(database);
    }

    let runtime = tokio::runtime::Runtime::new().context("failed to create Tokio runtime")?;
    runtime.block_on(async_main(args, config))
}

async fn async_main(args: Args, config: RoadwatchConfig) -> Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    if let Some(log_file) = &args.log_file {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_file)
            .context("failed to open log file")?;

        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(file)
                    .with_ansi(false),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    let store = SqliteStore::open(&config.daemon.database_path).with_context(|| {
        format!(
            "failed to open database {}",
            config.daemon.database_path.display()
        )
    })?;
    info!(
        path = %config.daemon.database_path.display(),
        list_limit = config.daemon.list_limit,
        "store opened"
    );

    let app = api::router(AppState::new(store, config.daemon.list_limit));

    let addr = config.daemon.listen_addr;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(addr = %addr, "roadwatch API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("API server error")?;

    info!("roadwatch daemon stopped");
    Ok(())
}

/// Resolves on SIGINT, or on SIGTERM where available.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            },
            Err(e) => {
                tracing::warn!(error = %e, "failed to register SIGTERM handler");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received SIGINT"),
        () = terminate => info!("Received SIGTERM"),
    }
}
