//! Server-Sent Events (SSE) utilities
//!
//! Live feeds send one JSON-encoded record per `data:` message, with no
//! event name, plus periodic `: keepalive` comment frames.

use axum::response::sse::{Event, KeepAlive};
use serde::Serialize;
use std::time::Duration;
use tracing::warn;

/// Comment text of the keep-alive frame
pub const KEEPALIVE_TEXT: &str = "keepalive";

/// Encode a record as a nameless SSE data message
///
/// Returns `None` (and logs) if the record cannot be serialized.
pub fn json_event<T: Serialize>(record: &T) -> Option<Event> {
    match Event::default().json_data(record) {
        Ok(event) => Some(event),
        Err(e) => {
            warn!("SSE: Failed to serialize record: {}", e);
            None
        }
    }
}

/// Keep-alive policy for live feeds
///
/// The keep-alive timer lives inside the response stream, so it stops as
/// soon as the client disconnects and the stream is dropped.
pub fn keep_alive(interval: Duration) -> KeepAlive {
    KeepAlive::new().interval(interval).text(KEEPALIVE_TEXT)
}
