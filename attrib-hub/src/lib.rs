//! attrib-hub library interface
//!
//! Ingests commit telemetry (OTLP/JSON), keeps a bounded window of recent
//! commit traces, maintains running AI/human/mixed attribution totals, and
//! streams both to live SSE subscribers.

pub mod api;
pub mod decoder;
pub mod error;
pub mod feed;

pub use crate::error::{ApiError, ApiResult};

use std::sync::Arc;

use attrib_common::config::HubConfig;
use axum::extract::DefaultBodyLimit;
use axum::http::{header, Method};
use axum::Router;
use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::feed::CommitFeed;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// The process-wide commit feed
    pub feed: Arc<CommitFeed>,
    pub config: Arc<HubConfig>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Cancelled on shutdown; ends open SSE streams so the server can drain
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Create state with a fresh, empty feed sized from `config`
    pub fn new(config: HubConfig) -> Self {
        let feed = Arc::new(CommitFeed::from_config(&config));
        Self::with_feed(feed, config)
    }

    pub fn with_feed(feed: Arc<CommitFeed>, config: HubConfig) -> Self {
        Self {
            feed,
            config: Arc::new(config),
            startup_time: Utc::now(),
            shutdown: CancellationToken::new(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .merge(api::ingest_routes())
        .merge(api::feed_routes())
        .merge(api::health_routes())
        .layer(DefaultBodyLimit::max(state.config.max_body_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
