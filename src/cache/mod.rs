//! Cache module for storing API responses in memory
//!
//! This module provides a response cache that keeps decoded API responses for the
//! lifetime of a single run, with a constructor-injected TTL (time-to-live). It
//! supports graceful degradation by handing back expired entries through
//! `get_stale`, allowing the caller to use stale data when the API is unavailable.

mod manager;

pub use manager::{CacheEntry, CachedData, ResponseCache, DEFAULT_TTL};
