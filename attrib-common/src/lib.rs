//! # attrib-common
//!
//! Shared code for the attribution hub:
//! - Commit trace records decoded from telemetry
//! - Attribution blob parsing
//! - Aggregate statistics and their fold arithmetic
//! - Configuration loading
//! - SSE framing helpers

pub mod attribution;
pub mod config;
pub mod error;
pub mod sse;
pub mod stats;
pub mod trace;

pub use attribution::AttributionStats;
pub use error::{Error, Result};
pub use stats::{AggregateStats, AttributionBucket};
pub use trace::CommitTrace;
