//! Attribution blob parsing
//!
//! The `git.ai.stats` span attribute carries a JSON object with AI, human and
//! mixed line counts. Upstream exporters sometimes encode it twice, so the
//! blob may arrive as a JSON string literal or with backslash-escaped quotes.
//! Any failure degrades to "no attribution data"; parsing never errors outward.

use serde::{de, Deserialize, Deserializer};
use serde_json::Value;
use tracing::debug;

/// Line attribution for one commit
///
/// `ai_percentage` is display-only. Aggregates always derive percentages
/// from the raw counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct AttributionStats {
    #[serde(default, deserialize_with = "count")]
    pub ai_additions: u64,
    #[serde(default, deserialize_with = "count")]
    pub human_additions: u64,
    #[serde(default, deserialize_with = "count")]
    pub mixed_additions: u64,
    #[serde(default, deserialize_with = "percentage")]
    pub ai_percentage: Option<f64>,
}

impl AttributionStats {
    /// Sum of the three line counters
    pub fn total_additions(&self) -> u64 {
        self.ai_additions
            .saturating_add(self.human_additions)
            .saturating_add(self.mixed_additions)
    }
}

/// Parse a raw attribution blob
///
/// Accepts a JSON object, a JSON string literal wrapping the object, or the
/// object text with `\"` escapes. Returns `None` for empty or malformed input.
pub fn parse(raw: &str) -> Option<AttributionStats> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    match decode(raw) {
        Ok(stats) => Some(stats),
        Err(e) => {
            debug!("Ignoring malformed attribution blob ({} bytes): {}", raw.len(), e);
            None
        }
    }
}

fn decode(raw: &str) -> serde_json::Result<AttributionStats> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::String(inner)) => from_object(serde_json::from_str(&inner)?),
        Ok(value) => from_object(value),
        Err(_) => from_object(serde_json::from_str(&raw.replace("\\\"", "\""))?),
    }
}

/// Only a JSON object carries counts; serde would otherwise fill the struct
/// from an array by position
fn from_object(value: Value) -> serde_json::Result<AttributionStats> {
    match value {
        Value::Object(_) => serde_json::from_value(value),
        Value::Array(_) => Err(de::Error::custom("expected an attribution object, found an array")),
        other => Err(de::Error::custom(format!("expected an attribution object, found {}", other))),
    }
}

/// Non-negative integer count; `null` reads as 0
fn count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<u64>::deserialize(deserializer)?.unwrap_or(0))
}

/// Percentage is informational, so an odd value is dropped rather than
/// failing the whole blob
fn percentage<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Value::deserialize(deserializer)?.as_f64())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_object() {
        let stats = parse(r#"{"ai_additions":10,"human_additions":5,"mixed_additions":2,"ai_percentage":58.8}"#)
            .unwrap();
        assert_eq!(stats.ai_additions, 10);
        assert_eq!(stats.human_additions, 5);
        assert_eq!(stats.mixed_additions, 2);
        assert_eq!(stats.ai_percentage, Some(58.8));
        assert_eq!(stats.total_additions(), 17);
    }

    #[test]
    fn parses_escaped_quotes() {
        let stats = parse(r#"{\"ai_additions\":10,\"human_additions\":5,\"mixed_additions\":0}"#).unwrap();
        assert_eq!(stats.ai_additions, 10);
        assert_eq!(stats.human_additions, 5);
        assert_eq!(stats.mixed_additions, 0);
    }

    #[test]
    fn parses_double_encoded_string_literal() {
        let stats = parse(r#""{\"ai_additions\":7,\"human_additions\":1}""#).unwrap();
        assert_eq!(stats.ai_additions, 7);
        assert_eq!(stats.human_additions, 1);
    }

    #[test]
    fn missing_and_null_counts_default_to_zero() {
        let stats = parse(r#"{"ai_additions":4,"mixed_additions":null}"#).unwrap();
        assert_eq!(stats.ai_additions, 4);
        assert_eq!(stats.human_additions, 0);
        assert_eq!(stats.mixed_additions, 0);
        assert_eq!(stats.ai_percentage, None);
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let stats = parse(r#"{"ai_additions":1,"tool_model_breakdown":{"claude":1}}"#).unwrap();
        assert_eq!(stats.ai_additions, 1);
    }

    #[test]
    fn odd_percentage_does_not_fail_counts() {
        let stats = parse(r#"{"ai_additions":2,"ai_percentage":"n/a"}"#).unwrap();
        assert_eq!(stats.ai_additions, 2);
        assert_eq!(stats.ai_percentage, None);
    }

    #[test]
    fn malformed_input_is_no_data() {
        assert_eq!(parse("not json"), None);
        assert_eq!(parse(""), None);
        assert_eq!(parse("   "), None);
        assert_eq!(parse("[1,2,3]"), None);
        assert_eq!(parse("42"), None);
        assert_eq!(parse(r#"{"ai_additions":"ten"}"#), None);
        assert_eq!(parse(r#"{"ai_additions":-3}"#), None);
        assert_eq!(parse(r#"{"ai_additions":1.5}"#), None);
    }

    #[test]
    fn positional_arrays_are_no_data() {
        assert_eq!(parse("[1,2,3]"), None);
        assert_eq!(parse(r#""[1,2,3]""#), None);
        assert_eq!(parse(r#""42""#), None);
        assert_eq!(parse("[10, 5, 0, 66.7]"), None);
    }
}
