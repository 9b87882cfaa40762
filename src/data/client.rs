//! Cached GitHub client
//!
//! Composes the fetcher with the response cache: fresh cache hits skip the
//! network, successful fetches refresh the cache, and failed fetches fall back
//! to the last known response for the same logical key.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::fetcher::{ApiRequest, FetchError, Fetcher};
use super::rate_limit::{RateLimitTracker, DEFAULT_LOW_WATER};
use super::retry::RetryPolicy;
use super::{
    CommitEntry, CommitItem, Event, HeadCommit, LanguageStats, ProfileData, Repository,
    SourceFailure,
};
use crate::cache::{ResponseCache, DEFAULT_TTL};

/// Upper bound on simultaneous in-flight requests for one bulk sequence
pub const MAX_FAN_OUT: usize = 10;

/// Events requested per page when looking for pushes
const EVENTS_PER_PAGE: u32 = 30;

/// Number of recent commits shown
const RECENT_COMMIT_LIMIT: usize = 5;

/// Longest commit message shown in the activity log
const COMMIT_MESSAGE_MAX_CHARS: usize = 50;

/// Message used when a push carries an empty commit message
const DEFAULT_COMMIT_MESSAGE: &str = "Updated files";

/// Repositories requested per page for language statistics
const REPOS_PER_PAGE: u32 = 10;

/// Repositories counted towards language statistics
const LANGUAGE_REPO_LIMIT: usize = 8;

/// Repositories not updated for this many days are skipped
const REPO_MAX_AGE_DAYS: i64 = 180;

/// Longest head-commit summary shown
const HEAD_SUMMARY_MAX_CHARS: usize = 30;

/// Tunables for one run of the client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientSettings {
    pub retry: RetryPolicy,
    pub cache_ttl: Duration,
    /// Requested bulk fan-out, clamped to `1..=MAX_FAN_OUT`
    pub fan_out: usize,
    /// Remaining-quota mark below which fan-out drops to one
    pub low_water: u32,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            cache_ttl: DEFAULT_TTL,
            fan_out: MAX_FAN_OUT,
            low_water: DEFAULT_LOW_WATER,
        }
    }
}

/// Recent push activity derived from the public events feed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Activity {
    pub recent_commits: Vec<CommitEntry>,
    pub last_push: Option<DateTime<Utc>>,
}

/// GitHub client that owns the response cache and rate-limit state of a run
#[derive(Debug)]
pub struct GitHubClient {
    fetcher: Fetcher,
    cache: ResponseCache,
    rate_limit: RateLimitTracker,
    username: String,
    settings: ClientSettings,
}

impl GitHubClient {
    /// Creates a client with a fresh cache for `username`
    pub fn new(fetcher: Fetcher, username: impl Into<String>, settings: ClientSettings) -> Self {
        let settings = ClientSettings {
            fan_out: settings.fan_out.clamp(1, MAX_FAN_OUT),
            ..settings
        };
        Self {
            fetcher,
            cache: ResponseCache::new(settings.cache_ttl),
            rate_limit: RateLimitTracker::new(settings.low_water),
            username: username.into(),
            settings,
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    pub fn rate_limit(&self) -> &RateLimitTracker {
        &self.rate_limit
    }

    /// Fetches the JSON body for `request`, cache first
    ///
    /// # Behavior
    /// - A fresh cache entry is returned without touching the network
    /// - While the quota is exhausted and its reset time is still ahead, no
    ///   request is dispatched and the call fails as `RateLimited`
    /// - A successful fetch overwrites the cache entry for the key
    /// - On failure, the last cached value for the key is returned unchanged if
    ///   there is one; otherwise the classified error propagates
    pub async fn get_json(&self, request: &ApiRequest) -> Result<Value, FetchError> {
        let key = request.cache_key();

        if let Some(value) = self.cache.get(&key) {
            debug!(key = %key, "cache hit");
            return Ok(value);
        }

        let result = match self.rate_limit.blocked_until(Utc::now()) {
            Some(reset_at) => {
                warn!(key = %key, reset_at = %reset_at, "rate limit exhausted, request not dispatched");
                Err(FetchError::RateLimited {
                    reset_at: Some(reset_at),
                })
            }
            None => self.fetcher.fetch(request, &self.settings.retry).await,
        };

        match result {
            Ok(response) => {
                self.rate_limit.observe(response.rate_limit);
                self.cache.put(&key, response.body.clone());
                Ok(response.body)
            }
            Err(error) => {
                if let FetchError::RateLimited {
                    reset_at: Some(reset_at),
                } = error
                {
                    self.rate_limit.mark_exhausted(Some(reset_at));
                }

                match self.cache.get_stale(&key) {
                    Some(stale) => {
                        warn!(
                            key = %key,
                            kind = error.kind(),
                            error = %error,
                            fetched_at = %stale.fetched_at,
                            "live fetch failed, serving stale cached response"
                        );
                        Ok(stale.data)
                    }
                    None => Err(error),
                }
            }
        }
    }

    /// Fetches and decodes `request` into `T`
    async fn get<T: DeserializeOwned>(&self, request: &ApiRequest) -> Result<T, FetchError> {
        let body = self.get_json(request).await?;
        serde_json::from_value(body).map_err(|e| {
            FetchError::Unknown(format!("unexpected payload for {}: {}", request.path, e))
        })
    }

    fn events_request(&self) -> ApiRequest {
        ApiRequest::new(format!("/users/{}/events/public", self.username))
            .query("per_page", EVENTS_PER_PAGE)
    }

    /// Recent pushed commits and the time of the newest push
    pub async fn activity(&self) -> Result<Activity, FetchError> {
        let events: Vec<Event> = self.get(&self.events_request()).await?;
        let activity = Activity {
            recent_commits: commits_from_events(&events),
            last_push: last_push_from_events(&events),
        };
        info!(commits = activity.recent_commits.len(), "fetched recent activity");
        Ok(activity)
    }

    /// Language byte counts summed over recently updated repositories
    ///
    /// Per-repository requests run concurrently, bounded by the fan-out width
    /// the rate-limit tracker allows when dispatch starts; the width is not
    /// revised while the sequence runs. A failed repository contributes
    /// nothing; if every repository fails, the last error is returned.
    pub async fn language_stats(&self, now: DateTime<Utc>) -> Result<LanguageStats, FetchError> {
        let request = ApiRequest::new(format!("/users/{}/repos", self.username))
            .query("sort", "updated")
            .query("per_page", REPOS_PER_PAGE);
        let repos: Vec<Repository> = self.get(&request).await?;

        let selected = select_repositories(&repos, now);
        if selected.is_empty() {
            info!("no recently updated repositories to count");
            return Ok(LanguageStats::empty());
        }

        let width = self.rate_limit.dispatch_width(self.settings.fan_out, now);
        debug!(repos = selected.len(), width, "fetching repository languages");

        let results: Vec<(&str, Result<BTreeMap<String, u64>, FetchError>)> =
            stream::iter(selected.iter().map(|repo| async move {
                (repo.name.as_str(), self.repo_languages(&repo.name).await)
            }))
            .buffer_unordered(width)
            .collect()
            .await;

        let mut stats = LanguageStats::empty();
        let mut succeeded = 0usize;
        let mut last_error = None;
        for (repo, result) in results {
            match result {
                Ok(languages) => {
                    stats.add(&languages);
                    succeeded += 1;
                }
                Err(error) => {
                    warn!(repo, kind = error.kind(), error = %error, "skipping repository languages");
                    last_error = Some(error);
                }
            }
        }

        match last_error {
            Some(error) if succeeded == 0 => Err(error),
            _ => {
                info!(repos = succeeded, bytes = stats.total_bytes(), "aggregated language statistics");
                Ok(stats)
            }
        }
    }

    async fn repo_languages(&self, repo: &str) -> Result<BTreeMap<String, u64>, FetchError> {
        let request = ApiRequest::new(format!("/repos/{}/{}/languages", self.username, repo));
        self.get(&request).await
    }

    /// Latest commit on the `{user}/{user}` profile repository
    pub async fn head_commit(&self) -> Result<Option<HeadCommit>, FetchError> {
        let request = ApiRequest::new(format!(
            "/repos/{}/{}/commits",
            self.username, self.username
        ))
        .query("per_page", 1);
        let commits: Vec<CommitItem> = self.get(&request).await?;
        Ok(commits.first().map(head_commit_from))
    }

    /// Gathers every data source concurrently
    ///
    /// Never fails: a source that cannot be served live or from cache is
    /// replaced by its placeholder and recorded in `failed_sources`.
    pub async fn profile(&self) -> ProfileData {
        let now = Utc::now();
        let (activity, languages, head_commit) = tokio::join!(
            self.activity(),
            self.language_stats(now),
            self.head_commit()
        );

        let mut failed_sources = Vec::new();
        let activity = or_placeholder("activity", activity, &mut failed_sources);
        let languages = or_placeholder("languages", languages, &mut failed_sources);
        let head_commit = or_placeholder("head_commit", head_commit, &mut failed_sources);

        ProfileData {
            username: self.username.clone(),
            generated_at: now,
            recent_commits: activity.recent_commits,
            last_push: activity.last_push,
            languages,
            head_commit,
            failed_sources,
        }
    }
}

/// Unwraps a source result or substitutes the source's placeholder
fn or_placeholder<T: Default>(
    source: &'static str,
    result: Result<T, FetchError>,
    failed: &mut Vec<SourceFailure>,
) -> T {
    match result {
        Ok(value) => value,
        Err(error) => {
            warn!(source, kind = error.kind(), error = %error, "data source unavailable, using placeholder");
            failed.push(SourceFailure { source, error });
            T::default()
        }
    }
}

/// Shortens `text` to `max` characters, marking the cut with `...`
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let mut cut: String = text.chars().take(max).collect();
        cut.push_str("...");
        cut
    } else {
        text.to_string()
    }
}

/// Newest pushes with at least one commit, newest first as the feed lists them
fn commits_from_events(events: &[Event]) -> Vec<CommitEntry> {
    events
        .iter()
        .filter(|event| event.kind == "PushEvent")
        .filter_map(|event| {
            let commit = event.payload.commits.last()?;
            let message = commit
                .message
                .as_deref()
                .filter(|m| !m.trim().is_empty())
                .unwrap_or(DEFAULT_COMMIT_MESSAGE);
            let repo = event
                .repo
                .name
                .split_once('/')
                .map_or(event.repo.name.as_str(), |(_, name)| name);
            Some(CommitEntry {
                repo: repo.to_string(),
                message: truncate(message, COMMIT_MESSAGE_MAX_CHARS),
                pushed_at: event.created_at,
            })
        })
        .take(RECENT_COMMIT_LIMIT)
        .collect()
}

fn last_push_from_events(events: &[Event]) -> Option<DateTime<Utc>> {
    events
        .iter()
        .filter(|event| event.kind == "PushEvent")
        .map(|event| event.created_at)
        .max()
}

/// Non-fork repositories updated within the age window, as listed
fn select_repositories(repos: &[Repository], now: DateTime<Utc>) -> Vec<&Repository> {
    repos
        .iter()
        .filter(|repo| !repo.fork)
        .filter(|repo| (now - repo.updated_at).num_days() < REPO_MAX_AGE_DAYS)
        .take(LANGUAGE_REPO_LIMIT)
        .collect()
}

fn head_commit_from(item: &CommitItem) -> HeadCommit {
    let first_line = item.commit.message.lines().next().unwrap_or_default();
    HeadCommit {
        short_sha: item.sha.chars().take(7).collect(),
        summary: truncate(first_line, HEAD_SUMMARY_MAX_CHARS),
    }
}
