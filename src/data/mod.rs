//! Core data models for the GitHub profile generator
//!
//! This module contains the API client stack (fetcher, retry, rate limit,
//! cached client) and the data types the profile document is built from.

pub mod client;
pub mod fetcher;
pub mod rate_limit;
pub mod retry;

pub use client::{ClientSettings, GitHubClient};
pub use fetcher::{ApiRequest, ApiResponse, ClientBuildError, FetchError, Fetcher, FetcherConfig};
pub use rate_limit::{RateLimitState, RateLimitTracker};
pub use retry::{RetryAttempt, RetryPolicy};

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A commit pushed recently by the profile owner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitEntry {
    /// Repository name without the owner prefix
    pub repo: String,
    /// Commit message, truncated for display
    pub message: String,
    /// When the push event was created
    pub pushed_at: DateTime<Utc>,
}

/// The latest commit on the profile repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadCommit {
    /// First seven characters of the commit sha
    pub short_sha: String,
    /// First line of the commit message, truncated for display
    pub summary: String,
}

/// Share of one language in the aggregate
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LanguageShare {
    pub name: String,
    /// Percentage of all counted bytes (0-100)
    pub percent: f64,
}

/// Byte counts per language summed across repositories
///
/// Merging is a plain sum, so the order in which per-repository results
/// arrive never changes the totals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageStats {
    pub bytes: BTreeMap<String, u64>,
}

impl LanguageStats {
    /// The zero-data aggregate used when nothing could be counted
    pub fn empty() -> Self {
        Self::default()
    }

    /// Adds one repository's byte counts
    pub fn add(&mut self, languages: &BTreeMap<String, u64>) {
        for (name, bytes) in languages {
            *self.bytes.entry(name.clone()).or_insert(0) += bytes;
        }
    }

    pub fn total_bytes(&self) -> u64 {
        self.bytes.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total_bytes() == 0
    }

    /// The `n` largest languages by share, largest first
    ///
    /// Ties are broken by name so the output is deterministic.
    pub fn top(&self, n: usize) -> Vec<LanguageShare> {
        let total = self.total_bytes();
        if total == 0 {
            return Vec::new();
        }

        let mut entries: Vec<(&String, &u64)> = self.bytes.iter().filter(|(_, b)| **b > 0).collect();
        entries.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

        entries
            .into_iter()
            .take(n)
            .map(|(name, bytes)| LanguageShare {
                name: name.clone(),
                percent: (*bytes as f64 / total as f64) * 100.0,
            })
            .collect()
    }
}

/// Everything the live profile document is rendered from
#[derive(Debug, Clone)]
pub struct ProfileData {
    pub username: String,
    pub generated_at: DateTime<Utc>,
    /// Recent pushed commits; empty means no recent activity
    pub recent_commits: Vec<CommitEntry>,
    /// Time of the newest push event, if known
    pub last_push: Option<DateTime<Utc>>,
    pub languages: LanguageStats,
    pub head_commit: Option<HeadCommit>,
    /// Sources that ended on their placeholder after a failure
    pub failed_sources: Vec<SourceFailure>,
}

/// A data source that could not be served live or from cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFailure {
    pub source: &'static str,
    pub error: FetchError,
}

/// Number of independent data sources a profile is assembled from
pub const PROFILE_SOURCE_COUNT: usize = 3;

impl ProfileData {
    /// Whether every data source failed, leaving nothing but placeholders
    pub fn all_sources_failed(&self) -> bool {
        self.failed_sources.len() >= PROFILE_SOURCE_COUNT
    }
}

// ===== Raw GitHub API payloads =====

/// One entry of `/users/{user}/events/public`
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Event {
    #[serde(rename = "type")]
    pub kind: String,
    pub repo: EventRepo,
    #[serde(default)]
    pub payload: EventPayload,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct EventRepo {
    /// `owner/name`
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct EventPayload {
    #[serde(default)]
    pub commits: Vec<PushCommit>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct PushCommit {
    #[serde(default)]
    pub message: Option<String>,
}

/// One entry of `/users/{user}/repos`
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Repository {
    pub name: String,
    #[serde(default)]
    pub fork: bool,
    pub updated_at: DateTime<Utc>,
}

/// One entry of `/repos/{owner}/{repo}/commits`
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CommitItem {
    pub sha: String,
    pub commit: CommitDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CommitDetail {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn langs(pairs: &[(&str, u64)]) -> BTreeMap<String, u64> {
        pairs.iter().map(|(n, b)| (n.to_string(), *b)).collect()
    }

    #[test]
    fn test_language_stats_sum_is_order_independent() {
        let a = langs(&[("Rust", 100), ("Shell", 5)]);
        let b = langs(&[("Rust", 50), ("Python", 20)]);
        let c = langs(&[("Python", 30)]);

        let mut forward = LanguageStats::empty();
        forward.add(&a);
        forward.add(&b);
        forward.add(&c);

        let mut backward = LanguageStats::empty();
        backward.add(&c);
        backward.add(&b);
        backward.add(&a);

        assert_eq!(forward, backward);
        assert_eq!(forward.total_bytes(), 205);
        assert_eq!(forward.bytes["Rust"], 150);
        assert_eq!(forward.bytes["Python"], 50);
    }

    #[test]
    fn test_language_stats_top_sorted_by_share() {
        let mut stats = LanguageStats::empty();
        stats.add(&langs(&[("Rust", 600), ("Go", 300), ("C", 100)]));

        let top = stats.top(2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].name, "Rust");
        assert!((top[0].percent - 60.0).abs() < 0.001);
        assert_eq!(top[1].name, "Go");
        assert!((top[1].percent - 30.0).abs() < 0.001);
    }

    #[test]
    fn test_language_stats_ties_broken_by_name() {
        let mut stats = LanguageStats::empty();
        stats.add(&langs(&[("Zig", 10), ("Ada", 10)]));

        let names: Vec<String> = stats.top(5).into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["Ada", "Zig"]);
    }

    #[test]
    fn test_empty_language_stats() {
        let stats = LanguageStats::empty();
        assert!(stats.is_empty());
        assert!(stats.top(5).is_empty());
    }

    #[test]
    fn test_event_deserialization_without_payload_commits() {
        let event: Event = serde_json::from_str(
            r#"{
                "type": "WatchEvent",
                "repo": {"name": "octocat/hello"},
                "payload": {"action": "started"},
                "created_at": "2024-07-15T05:30:00Z"
            }"#,
        )
        .expect("Failed to deserialize Event");

        assert_eq!(event.kind, "WatchEvent");
        assert!(event.payload.commits.is_empty());
    }

    #[test]
    fn test_repository_fork_defaults_to_false() {
        let repo: Repository =
            serde_json::from_str(r#"{"name": "hello", "updated_at": "2024-07-15T05:30:00Z"}"#)
                .expect("Failed to deserialize Repository");
        assert!(!repo.fork);
    }

    #[test]
    fn test_all_sources_failed() {
        let mut data = ProfileData {
            username: "octocat".to_string(),
            generated_at: Utc::now(),
            recent_commits: Vec::new(),
            last_push: None,
            languages: LanguageStats::empty(),
            head_commit: None,
            failed_sources: Vec::new(),
        };
        assert!(!data.all_sources_failed());

        for source in ["activity", "languages", "head_commit"] {
            data.failed_sources.push(SourceFailure {
                source,
                error: FetchError::Timeout,
            });
        }
        assert!(data.all_sources_failed());
    }
}
