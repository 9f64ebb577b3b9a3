//! Trace ingestion endpoint
//!
//! POST /api/v1/traces accepts an OTLP/JSON trace export. Any body that is
//! valid JSON is acknowledged, even one that yields zero traces. A body that
//! is not JSON is rejected with 400 and changes nothing. OPTIONS requests,
//! pre-flight or not, are answered by the router's `CorsLayer`.

use axum::{body::Bytes, extract::State, routing::post, Json, Router};
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::{decoder, ApiError, ApiResult, AppState};

/// Ingestion acknowledgment
#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub status: &'static str,
    /// Number of commit traces decoded and ingested
    pub accepted: usize,
}

/// POST /api/v1/traces
///
/// The body is read as raw bytes so exporters that omit or mislabel
/// `Content-Type` are still accepted.
pub async fn ingest_traces(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<Json<IngestResponse>> {
    let payload: Value = serde_json::from_slice(&body).map_err(|e| {
        warn!("Rejecting undecodable trace payload ({} bytes): {}", body.len(), e);
        ApiError::BadRequest(format!("Invalid payload: {}", e))
    })?;

    let accepted = state.feed.ingest_all(decoder::decode(&payload, Utc::now()));
    info!("Ingested {} commit trace(s)", accepted);

    Ok(Json(IngestResponse {
        status: "ok",
        accepted,
    }))
}

/// Build ingestion routes
pub fn ingest_routes() -> Router<AppState> {
    Router::new().route("/api/v1/traces", post(ingest_traces))
}
