//! GitHub rate-limit bookkeeping
//!
//! Parses the `x-ratelimit-*` response headers and keeps the most recent
//! observation so bulk request sequences can throttle themselves.

use std::sync::Mutex;

use chrono::{DateTime, TimeZone, Utc};
use reqwest::header::HeaderMap;
use tracing::warn;

/// Remaining-request count under which fan-out is reduced to one
pub const DEFAULT_LOW_WATER: u32 = 50;

const LIMIT_HEADER: &str = "x-ratelimit-limit";
const REMAINING_HEADER: &str = "x-ratelimit-remaining";
const RESET_HEADER: &str = "x-ratelimit-reset";

/// Rate-limit window as reported by one API response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitState {
    /// Requests allowed per window, if reported
    pub limit: Option<u32>,
    /// Requests left in the current window
    pub remaining: u32,
    /// When the window resets
    pub reset_at: Option<DateTime<Utc>>,
}

impl RateLimitState {
    /// Reads the rate-limit headers of a response
    ///
    /// Returns `None` when `x-ratelimit-remaining` is absent or malformed.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let remaining = header_u64(headers, REMAINING_HEADER)?;
        let limit = header_u64(headers, LIMIT_HEADER).map(|v| v.min(u32::MAX as u64) as u32);
        let reset_at = header_u64(headers, RESET_HEADER)
            .and_then(|secs| i64::try_from(secs).ok())
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single());

        Some(Self {
            limit,
            remaining: remaining.min(u32::MAX as u64) as u32,
            reset_at,
        })
    }

    /// Whether the quota is used up
    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }

    /// Whether the reported window is still running at `now`
    ///
    /// A missing reset time is treated as still running.
    fn window_open(&self, now: DateTime<Utc>) -> bool {
        self.reset_at.map_or(true, |reset_at| reset_at > now)
    }
}

fn header_u64(headers: &HeaderMap, name: &str) -> Option<u64> {
    headers.get(name)?.to_str().ok()?.trim().parse().ok()
}

/// Most recent rate-limit observation shared by all requests of a run
///
/// Advisory only: it never blocks an in-flight request. It decides how wide
/// bulk fan-out may be and refuses new dispatch while the quota is exhausted.
#[derive(Debug)]
pub struct RateLimitTracker {
    latest: Mutex<Option<RateLimitState>>,
    low_water: u32,
}

impl Default for RateLimitTracker {
    fn default() -> Self {
        Self::new(DEFAULT_LOW_WATER)
    }
}

impl RateLimitTracker {
    pub fn new(low_water: u32) -> Self {
        Self {
            latest: Mutex::new(None),
            low_water,
        }
    }

    /// Records the state carried by a response
    pub fn observe(&self, state: Option<RateLimitState>) {
        let Some(state) = state else {
            return;
        };
        if state.remaining < self.low_water {
            warn!(
                remaining = state.remaining,
                limit = ?state.limit,
                reset_at = ?state.reset_at,
                "GitHub rate limit running low"
            );
        }
        *self.latest.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(state);
    }

    /// Records a rejected request: nothing is left until `reset_at`
    pub fn mark_exhausted(&self, reset_at: Option<DateTime<Utc>>) {
        let mut latest = self.latest.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let limit = (*latest).and_then(|state| state.limit);
        *latest = Some(RateLimitState {
            limit,
            remaining: 0,
            reset_at,
        });
    }

    /// Snapshot of the latest observation
    pub fn current(&self) -> Option<RateLimitState> {
        *self.latest.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// If the quota is exhausted and a known reset is still ahead, the time to
    /// wait for
    ///
    /// An exhausted quota with no reset time never blocks dispatch; it only
    /// narrows [`RateLimitTracker::dispatch_width`].
    pub fn blocked_until(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let state = self.current()?;
        if !state.is_exhausted() {
            return None;
        }
        state.reset_at.filter(|reset_at| *reset_at > now)
    }

    /// How many requests a bulk sequence may keep in flight
    ///
    /// Falls back to one at a time while the quota is below the low-water mark.
    pub fn dispatch_width(&self, requested: usize, now: DateTime<Utc>) -> usize {
        let requested = requested.max(1);
        match self.current() {
            Some(state) if state.remaining < self.low_water && state.window_open(now) => 1,
            _ => requested,
        }
    }
}
