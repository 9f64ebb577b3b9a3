//! attrib-hub - Commit attribution telemetry hub
//!
//! Receives OTLP/JSON commit spans on POST /api/v1/traces and streams the
//! recent commit window and running AI attribution totals over SSE.

use std::path::PathBuf;

use anyhow::{Context, Result};
use attrib_common::config::{self, ConfigLayer};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use attrib_hub::{build_router, AppState};

/// Command-line arguments for attrib-hub
///
/// Unset flags fall back to ATTRIB_HUB_* environment variables, then the
/// config file, then compiled defaults.
#[derive(Parser, Debug)]
#[command(name = "attrib-hub")]
#[command(about = "Commit attribution telemetry hub")]
#[command(version)]
struct Args {
    /// Config file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Interface to bind
    #[arg(long)]
    bind_addr: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Number of recent traces to retain
    #[arg(long)]
    window_capacity: Option<usize>,

    /// Seconds between SSE keep-alive comments
    #[arg(long)]
    keepalive_secs: Option<u64>,

    /// Maximum ingestion body size in bytes
    #[arg(long)]
    max_body_bytes: Option<usize>,

    /// Live listener count that triggers a capacity warning
    #[arg(long)]
    listener_warn_threshold: Option<usize>,
}

impl Args {
    fn layer(&self) -> ConfigLayer {
        ConfigLayer {
            bind_addr: self.bind_addr.clone(),
            port: self.port,
            window_capacity: self.window_capacity,
            keepalive_secs: self.keepalive_secs,
            max_body_bytes: self.max_body_bytes,
            listener_warn_threshold: self.listener_warn_threshold,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "attrib_hub=info,attrib_common=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting attrib-hub v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let args = Args::parse();
    let config = config::resolve(args.layer(), args.config.as_deref())
        .context("Failed to load configuration")?;
    info!(
        "Window capacity {}, keep-alive {}s, body limit {} bytes",
        config.window_capacity, config.keepalive_secs, config.max_body_bytes
    );

    let addr = config.listen_addr();
    let state = AppState::new(config);
    let shutdown = state.shutdown.clone();
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("Ingest: POST http://{}/api/v1/traces", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            shutdown.cancel();
        })
        .await
        .context("Server error")?;

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
