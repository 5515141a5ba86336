//! Berth node - self-hosted git service.
//!
//! Serves the git smart HTTP transport and the repository/token API from a
//! single process over one data directory.

use anyhow::Context;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

use berth_node::config::Config;
use berth_node::logging::{init_logging, LogFormat};
use berth_node::router::build_router;
use berth_node::state::AppState;

/// Berth node - self-hosted git service
#[derive(Parser, Debug)]
#[command(name = "berth-node")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file; defaults apply when absent
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// HTTP listen address (overrides config)
    #[arg(long)]
    listen_addr: Option<SocketAddr>,

    /// Data directory (overrides config)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error; overrides config)
    #[arg(long)]
    log_level: Option<String>,

    /// Log format (pretty, json; overrides config)
    #[arg(long)]
    log_format: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(listen_addr) = args.listen_addr {
        config.listen_addr = listen_addr;
    }
    if let Some(data_dir) = args.data_dir {
        config.data_dir = data_dir;
    }
    if let Some(log_level) = args.log_level {
        config.log_level = log_level;
    }
    if let Some(log_format) = args.log_format {
        config.log_format = log_format;
    }

    init_logging(&config.log_level, LogFormat::parse(&config.log_format));
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting berth node");

    std::fs::create_dir_all(&config.data_dir)
        .with_context(|| format!("creating data directory {}", config.data_dir.display()))?;

    let state = AppState::from_config(&config);
    let router = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.listen_addr))?;
    tracing::info!(
        listen_addr = %config.listen_addr,
        data_dir = %config.data_dir.display(),
        "berth node listening"
    );

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("berth node stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}
