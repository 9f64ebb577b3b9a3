//! Aggregate attribution statistics
//!
//! `AggregateStats` is the running summary across every ingested commit:
//! global sums plus per-author and per-repository buckets. It is updated
//! incrementally, one trace at a time, and never recomputed from the window.
//!
//! Invariant: `ai_lines + human_lines + mixed_lines == total_lines_added`, and
//! each bucket holds the exact sub-sum of the traces carrying its key.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::attribution::AttributionStats;
use crate::trace::CommitTrace;

/// Per-author or per-repository sums
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributionBucket {
    pub commits: u64,
    pub ai_lines: u64,
    pub human_lines: u64,
    pub mixed_lines: u64,
}

impl AttributionBucket {
    fn add(&mut self, stats: &AttributionStats) {
        self.commits = self.commits.saturating_add(1);
        self.ai_lines = self.ai_lines.saturating_add(stats.ai_additions);
        self.human_lines = self.human_lines.saturating_add(stats.human_additions);
        self.mixed_lines = self.mixed_lines.saturating_add(stats.mixed_additions);
    }

    pub fn total_lines(&self) -> u64 {
        self.ai_lines
            .saturating_add(self.human_lines)
            .saturating_add(self.mixed_lines)
    }
}

/// Running summary of attribution across all ingested traces
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateStats {
    /// Successfully ingested traces, whether or not attribution parsed
    pub total_commits: u64,
    pub total_lines_added: u64,
    pub ai_lines: u64,
    pub human_lines: u64,
    pub mixed_lines: u64,
    /// Keyed by raw author name; the empty string is a valid key
    pub by_author: BTreeMap<String, AttributionBucket>,
    /// Keyed by raw repository name; the empty string is a valid key
    pub by_repo: BTreeMap<String, AttributionBucket>,
}

impl AggregateStats {
    /// Fold one trace into the summary
    ///
    /// A trace whose attribution blob does not parse still counts as a
    /// commit, contributing zero lines. Returns the parsed attribution, if any.
    pub fn fold(&mut self, trace: &CommitTrace) -> Option<AttributionStats> {
        let parsed = trace.attribution();
        self.apply(&trace.author, &trace.repo, &parsed.unwrap_or_default());
        parsed
    }

    /// Apply already-parsed attribution for one commit
    pub fn apply(&mut self, author: &str, repo: &str, stats: &AttributionStats) {
        self.total_commits = self.total_commits.saturating_add(1);
        self.ai_lines = self.ai_lines.saturating_add(stats.ai_additions);
        self.human_lines = self.human_lines.saturating_add(stats.human_additions);
        self.mixed_lines = self.mixed_lines.saturating_add(stats.mixed_additions);
        self.total_lines_added = self.total_lines_added.saturating_add(stats.total_additions());

        bucket(&mut self.by_author, author).add(stats);
        bucket(&mut self.by_repo, repo).add(stats);
    }

    /// Check the global line-sum invariant
    pub fn is_consistent(&self) -> bool {
        self.ai_lines
            .checked_add(self.human_lines)
            .and_then(|sum| sum.checked_add(self.mixed_lines))
            == Some(self.total_lines_added)
    }
}

fn bucket<'a>(map: &'a mut BTreeMap<String, AttributionBucket>, key: &str) -> &'a mut AttributionBucket {
    map.entry(key.to_owned()).or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(ai: u64, human: u64, mixed: u64) -> AttributionStats {
        AttributionStats {
            ai_additions: ai,
            human_additions: human,
            mixed_additions: mixed,
            ai_percentage: None,
        }
    }

    fn trace(author: &str, repo: &str, ai_stats: &str) -> CommitTrace {
        CommitTrace {
            id: format!("{}-{}", author, repo),
            timestamp: String::new(),
            trace_id: String::new(),
            span_id: String::new(),
            commit_id: String::new(),
            commit_short: String::new(),
            message: String::new(),
            author: author.to_string(),
            email: String::new(),
            branch: String::new(),
            repo: repo.to_string(),
            ai_stats: ai_stats.to_string(),
        }
    }

    #[test]
    fn starts_zeroed() {
        let agg = AggregateStats::default();
        assert_eq!(agg.total_commits, 0);
        assert_eq!(agg.total_lines_added, 0);
        assert!(agg.by_author.is_empty());
        assert!(agg.by_repo.is_empty());
        assert!(agg.is_consistent());
    }

    #[test]
    fn apply_updates_global_and_keyed_sums() {
        let mut agg = AggregateStats::default();
        agg.apply("ana", "core", &stats(10, 5, 1));
        agg.apply("ana", "web", &stats(2, 0, 0));
        agg.apply("ben", "core", &stats(0, 7, 3));

        assert_eq!(agg.total_commits, 3);
        assert_eq!(agg.ai_lines, 12);
        assert_eq!(agg.human_lines, 12);
        assert_eq!(agg.mixed_lines, 4);
        assert_eq!(agg.total_lines_added, 28);
        assert!(agg.is_consistent());

        let ana = agg.by_author["ana"];
        assert_eq!(ana, AttributionBucket { commits: 2, ai_lines: 12, human_lines: 5, mixed_lines: 1 });
        let core = agg.by_repo["core"];
        assert_eq!(core, AttributionBucket { commits: 2, ai_lines: 10, human_lines: 12, mixed_lines: 4 });
        assert_eq!(agg.by_repo["web"].total_lines(), 2);
    }

    #[test]
    fn malformed_blob_counts_commit_only() {
        let mut agg = AggregateStats::default();
        let parsed = agg.fold(&trace("ana", "core", "not json"));

        assert!(parsed.is_none());
        assert_eq!(agg.total_commits, 1);
        assert_eq!(agg.total_lines_added, 0);
        assert_eq!(agg.ai_lines + agg.human_lines + agg.mixed_lines, 0);
        assert_eq!(agg.by_author["ana"].commits, 1);
        assert_eq!(agg.by_author["ana"].total_lines(), 0);
    }

    #[test]
    fn empty_keys_are_kept_verbatim() {
        let mut agg = AggregateStats::default();
        agg.fold(&trace("", "", r#"{"ai_additions":1}"#));
        agg.fold(&trace("Ana", "core", r#"{"ai_additions":1}"#));
        agg.fold(&trace("ana", "core", r#"{"ai_additions":1}"#));

        assert_eq!(agg.by_author[""].ai_lines, 1);
        assert_eq!(agg.by_repo[""].commits, 1);
        // Near-duplicate names stay separate
        assert_eq!(agg.by_author.len(), 3);
    }

    #[test]
    fn serializes_with_camel_case_keys() {
        let mut agg = AggregateStats::default();
        agg.apply("ana", "core", &stats(1, 2, 3));
        let json = serde_json::to_value(&agg).unwrap();

        assert_eq!(json["totalCommits"], 1);
        assert_eq!(json["totalLinesAdded"], 6);
        assert_eq!(json["byAuthor"]["ana"]["aiLines"], 1);
        assert_eq!(json["byRepo"]["core"]["mixedLines"], 3);
    }
}
