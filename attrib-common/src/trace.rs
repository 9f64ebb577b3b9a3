//! Commit trace record
//!
//! One `CommitTrace` is produced per telemetry span. Records are immutable
//! once built; the event store owns them after ingestion.

use serde::{Deserialize, Serialize};

use crate::attribution::{self, AttributionStats};

/// One decoded commit-attribution telemetry record
///
/// Every free-text field is the empty string when the upstream attribute was
/// absent. Absence is never an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitTrace {
    /// Unique record id: trace id, span id, ingestion millis and a random nonce
    pub id: String,
    /// Ingestion wall-clock time, RFC 3339 UTC with millisecond precision
    pub timestamp: String,
    pub trace_id: String,
    pub span_id: String,
    pub commit_id: String,
    pub commit_short: String,
    pub message: String,
    pub author: String,
    pub email: String,
    pub branch: String,
    pub repo: String,
    /// Raw attribution blob, possibly with escaped quotes. Parsed on demand.
    pub ai_stats: String,
}

impl CommitTrace {
    /// Parse the embedded attribution blob
    ///
    /// Returns `None` when the blob is empty or malformed.
    pub fn attribution(&self) -> Option<AttributionStats> {
        attribution::parse(&self.ai_stats)
    }
}
