//! HTTP API handlers for attrib-hub

pub mod feeds;
pub mod health;
pub mod ingest;

pub use feeds::{feed_routes, snapshot, stats_stream, trace_stream};
pub use health::health_routes;
pub use ingest::{ingest_routes, ingest_traces};
