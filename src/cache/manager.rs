//! Response cache keyed by logical request
//!
//! Provides a `ResponseCache` that stores JSON response bodies stamped with the
//! time they were fetched, supporting graceful degradation when the API is
//! unavailable.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use serde_json::Value;

/// Default freshness window for cached responses (5 minutes)
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// A stored response for one logical key
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Logical key this entry belongs to
    pub key: String,
    /// The decoded response body
    pub value: Value,
    /// When the response was successfully fetched
    pub fetched_at: DateTime<Utc>,
}

/// Result of a stale read, including metadata about cache freshness
#[derive(Debug, Clone)]
pub struct CachedData {
    /// The cached response body
    pub data: Value,
    /// When the data was originally fetched
    pub fetched_at: DateTime<Utc>,
    /// Whether the entry is past its TTL
    pub is_expired: bool,
}

/// In-memory cache of successful API responses
///
/// Each run owns exactly one instance. Entries are partitioned by key in a
/// sharded map, so writes to distinct keys never contend and a reader of a key
/// sees either the previous or the replacement entry, never a mix.
#[derive(Debug)]
pub struct ResponseCache {
    entries: DashMap<String, CacheEntry>,
    ttl: Duration,
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl ResponseCache {
    /// Creates an empty cache whose entries stay fresh for `ttl`
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Returns the configured time-to-live
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn is_fresh(&self, fetched_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        let ttl = TimeDelta::from_std(self.ttl).unwrap_or(TimeDelta::MAX);
        now.signed_duration_since(fetched_at) < ttl
    }

    /// Returns the cached value only while it is within the TTL window
    pub fn get(&self, key: &str) -> Option<Value> {
        let entry = self.entries.get(key)?;
        if self.is_fresh(entry.fetched_at, Utc::now()) {
            Some(entry.value.clone())
        } else {
            None
        }
    }

    /// Returns the cached value regardless of age
    ///
    /// Returns `None` only if the key was never populated.
    pub fn get_stale(&self, key: &str) -> Option<CachedData> {
        let entry = self.entries.get(key)?;
        Some(CachedData {
            data: entry.value.clone(),
            fetched_at: entry.fetched_at,
            is_expired: !self.is_fresh(entry.fetched_at, Utc::now()),
        })
    }

    /// Stores `value` under `key` stamped with the current time
    ///
    /// Overwrites any prior entry for that key.
    pub fn put(&self, key: &str, value: Value) {
        let entry = CacheEntry {
            key: key.to_string(),
            value,
            fetched_at: Utc::now(),
        };
        self.entries.insert(key.to_string(), entry);
    }

    /// Returns a snapshot of the entry stored under `key`
    pub fn entry(&self, key: &str) -> Option<CacheEntry> {
        self.entries.get(key).map(|entry| entry.clone())
    }

    /// Number of keys ever populated
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
