//! ACS Streamer (acs-streamer) - Main entry point
//!
//! Serves the WebSocket streaming endpoint, the audio listing API and the
//! static web client.

use std::net::SocketAddr;
use std::path::PathBuf;

use acs_common::config::{self, ConfigOverrides};
use acs_streamer::{build_router, AppState};
use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for acs-streamer
#[derive(Parser, Debug)]
#[command(name = "acs-streamer")]
#[command(about = "Chunked WebSocket audio streamer")]
#[command(version)]
struct Args {
    /// Path to acs.toml (defaults to the platform config directory)
    #[arg(short, long, env = "ACS_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Directory containing the audio files to stream
    #[arg(short, long)]
    resource_dir: Option<PathBuf>,

    /// Directory served as the static web client
    #[arg(long)]
    static_dir: Option<PathBuf>,

    /// Bytes per binary frame
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Delay between chunks in milliseconds
    #[arg(long)]
    pacing_ms: Option<u64>,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            port: self.port,
            resource_dir: self.resource_dir.clone(),
            static_dir: self.static_dir.clone(),
            chunk_size: self.chunk_size,
            pacing_ms: self.pacing_ms,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = config::resolve(args.config.as_deref(), args.overrides())
        .context("Failed to load configuration")?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("acs_streamer={0},acs_common={0},tower_http=debug", config.logging.level)
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting ACS Streamer (acs-streamer) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    info!("Resource folder: {}", config.resource_dir.display());
    info!("Static folder: {}", config.static_dir.display());
    info!(
        "Chunk size {} bytes, pacing {} ms",
        config.streaming.chunk_size, config.streaming.pacing_ms
    );
    if !config.resource_dir.is_dir() {
        warn!(
            "Resource folder {} does not exist; every start will report not found",
            config.resource_dir.display()
        );
    }

    let app = build_router(AppState::from_config(&config));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Starting HTTP server on {}", addr);
    info!("Open http://localhost:{} in your browser", config.port);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
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
