//! OTLP/JSON payload decoding
//!
//! Turns a trace export body into one `CommitTrace` per span:
//!
//! ```text
//! { "resourceSpans": [ { "resource": { "attributes": [...] },
//!                        "scopeSpans": [ { "spans": [ { "traceId", "spanId", "attributes": [...] } ] } ] } ] }
//! ```
//!
//! Decoding is lenient below the top level. Missing or non-array
//! `resourceSpans` / `scopeSpans` / `spans` contribute nothing, and a missing
//! or oddly shaped attribute resolves to the empty string. The decoder holds
//! no state and performs no I/O.

use attrib_common::CommitTrace;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use uuid::Uuid;

/// Span and resource attribute keys
pub mod keys {
    pub const COMMIT_ID: &str = "vcs.commit.id";
    pub const COMMIT_SHORT: &str = "vcs.commit.id.short";
    pub const MESSAGE: &str = "vcs.commit.message";
    pub const AUTHOR_NAME: &str = "vcs.commit.author.name";
    pub const AUTHOR_EMAIL: &str = "vcs.commit.author.email";
    pub const BRANCH: &str = "vcs.branch";
    pub const AI_STATS: &str = "git.ai.stats";
    /// Looked up on the enclosing resource, not the span
    pub const REPOSITORY: &str = "vcs.repository.name";
}

/// Ingestion instant shared by every trace decoded from one payload
#[derive(Debug, Clone)]
struct IngestStamp {
    millis: i64,
    timestamp: String,
}

impl IngestStamp {
    fn new(received_at: DateTime<Utc>) -> Self {
        Self {
            millis: received_at.timestamp_millis(),
            timestamp: received_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    /// Trace and span ids may repeat, so the id also carries the ingestion
    /// millis and a random nonce
    fn record_id(&self, trace_id: &str, span_id: &str) -> String {
        let nonce = Uuid::new_v4().simple().to_string();
        format!("{}-{}-{}-{}", trace_id, span_id, self.millis, &nonce[..8])
    }
}

/// Lazily decode every span of `payload`, in document order
///
/// Order is resource group, then scope group, then span. Each span's `repo`
/// comes from its own resource group only.
pub fn decode(payload: &Value, received_at: DateTime<Utc>) -> impl Iterator<Item = CommitTrace> + '_ {
    let stamp = IngestStamp::new(received_at);

    list(payload, "resourceSpans").iter().flat_map(move |group| {
        let resource_attrs = group
            .get("resource")
            .map(|resource| list(resource, "attributes"))
            .unwrap_or_default();
        let repo = attribute(resource_attrs, keys::REPOSITORY);
        let stamp = stamp.clone();

        list(group, "scopeSpans")
            .iter()
            .flat_map(|scope| list(scope, "spans").iter())
            .map(move |span| build_trace(span, &repo, &stamp))
    })
}

fn build_trace(span: &Value, repo: &str, stamp: &IngestStamp) -> CommitTrace {
    let attrs = list(span, "attributes");
    let trace_id = text(span, "traceId");
    let span_id = text(span, "spanId");

    CommitTrace {
        id: stamp.record_id(&trace_id, &span_id),
        timestamp: stamp.timestamp.clone(),
        commit_id: attribute(attrs, keys::COMMIT_ID),
        commit_short: attribute(attrs, keys::COMMIT_SHORT),
        message: attribute(attrs, keys::MESSAGE),
        author: attribute(attrs, keys::AUTHOR_NAME),
        email: attribute(attrs, keys::AUTHOR_EMAIL),
        branch: attribute(attrs, keys::BRANCH),
        repo: repo.to_owned(),
        ai_stats: attribute(attrs, keys::AI_STATS),
        trace_id,
        span_id,
    }
}

/// Array under `key`, or an empty slice when absent or not an array
fn list<'a>(value: &'a Value, key: &str) -> &'a [Value] {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

fn text(value: &Value, key: &str) -> String {
    value.get(key).and_then(Value::as_str).unwrap_or_default().to_owned()
}

/// Resolve an attribute by key from an OTLP attribute list
///
/// A non-empty `stringValue` wins, then `intValue` as text (OTLP/JSON sends
/// 64-bit ints as strings, some exporters as numbers), else `""`.
pub fn attribute(attrs: &[Value], key: &str) -> String {
    let Some(value) = attrs
        .iter()
        .find(|attr| attr.get("key").and_then(Value::as_str) == Some(key))
        .and_then(|attr| attr.get("value"))
    else {
        return String::new();
    };

    if let Some(s) = value.get("stringValue").and_then(Value::as_str) {
        if !s.is_empty() {
            return s.to_owned();
        }
    }

    match value.get("intValue") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) if n.is_i64() || n.is_u64() => n.to_string(),
        _ => String::new(),
    }
}
