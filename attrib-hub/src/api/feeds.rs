//! Live feeds (SSE) and the polling snapshot
//!
//! Each SSE connection first replays current state, then forwards every
//! publish. The listener pushes into an unbounded per-connection channel, so
//! a slow client never blocks ingestion. The connection's `Subscription`
//! lives inside the response stream: when the client disconnects, axum
//! drops the stream, which deregisters the listener and stops the
//! keep-alive timer. Streams also end when the server begins shutting down.

use std::convert::Infallible;

use attrib_common::{sse, AggregateStats, CommitTrace};
use axum::{
    extract::State,
    response::sse::{Event, Sse},
    routing::get,
    Json, Router,
};
use futures::stream::Stream;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::feed::{ListenerError, Subscription};
use crate::AppState;

/// Logs the disconnect and releases the listener when the stream is dropped
struct FeedConnection {
    feed: &'static str,
    _subscription: Subscription,
}

impl Drop for FeedConnection {
    fn drop(&mut self) {
        info!("SSE client disconnected from {} feed", self.feed);
    }
}

/// GET /api/events - SSE trace feed
///
/// Replays the current window newest-first, then streams each new trace.
pub async fn trace_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (tx, mut rx) = mpsc::unbounded_channel::<CommitTrace>();
    let (replay, subscription) = state.feed.subscribe_traces_with_replay(move |trace| {
        tx.send(trace.clone()).map_err(|_| ListenerError::Disconnected)
    });
    info!("New SSE client connected to trace feed ({} replayed)", replay.len());
    let shutdown = state.shutdown.clone();

    let connection = FeedConnection { feed: "trace", _subscription: subscription };

    let stream = async_stream::stream! {
        let _connection = connection;

        for trace in replay {
            if let Some(event) = sse::json_event(&trace) {
                yield Ok(event);
            }
        }

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                next = rx.recv() => {
                    let Some(trace) = next else { break };
                    debug!("SSE: Forwarding trace {}", trace.id);
                    if let Some(event) = sse::json_event(&trace) {
                        yield Ok(event);
                    }
                }
            }
        }
    };

    Sse::new(stream).keep_alive(sse::keep_alive(state.config.keepalive()))
}

/// GET /api/stats - SSE aggregate feed
///
/// Sends the current aggregate, then a fresh one after every ingest.
pub async fn stats_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (tx, mut rx) = mpsc::unbounded_channel::<AggregateStats>();
    let (initial, subscription) = state.feed.subscribe_stats_with_replay(move |stats| {
        tx.send(stats.clone()).map_err(|_| ListenerError::Disconnected)
    });
    info!("New SSE client connected to stats feed");
    let shutdown = state.shutdown.clone();

    let connection = FeedConnection { feed: "stats", _subscription: subscription };

    let stream = async_stream::stream! {
        let _connection = connection;

        if let Some(event) = sse::json_event(&initial) {
            yield Ok(event);
        }

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                next = rx.recv() => {
                    let Some(stats) = next else { break };
                    if let Some(event) = sse::json_event(&stats) {
                        yield Ok(event);
                    }
                }
            }
        }
    };

    Sse::new(stream).keep_alive(sse::keep_alive(state.config.keepalive()))
}

/// Polling snapshot response
#[derive(Debug, Serialize)]
pub struct SnapshotResponse {
    /// Current window, newest first
    pub traces: Vec<CommitTrace>,
    pub stats: AggregateStats,
}

/// GET /api/snapshot - window and aggregate as one JSON document
pub async fn snapshot(State(state): State<AppState>) -> Json<SnapshotResponse> {
    let (traces, stats) = state.feed.snapshot_with_stats();
    Json(SnapshotResponse { traces, stats })
}

/// Build live feed and snapshot routes
pub fn feed_routes() -> Router<AppState> {
    Router::new()
        .route("/api/events", get(trace_stream))
        .route("/api/stats", get(stats_stream))
        .route("/api/snapshot", get(snapshot))
}
