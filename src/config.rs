//! Environment configuration
//!
//! Reads the credential, target account, API base URL and display offset
//! from environment variables. Empty values count as unset.

use chrono::FixedOffset;
use thiserror::Error;

use crate::data::fetcher::{FetcherConfig, GITHUB_API_BASE_URL};

/// Access credential (required for any API call)
pub const TOKEN_VAR: &str = "GITHUB_TOKEN";
/// Account the profile is generated for
pub const USERNAME_VAR: &str = "GITHUB_USERNAME";
/// REST API base URL; GitHub Actions sets this on every runner
pub const API_URL_VAR: &str = "GITHUB_API_URL";
/// Display offset from UTC in minutes
pub const UTC_OFFSET_VAR: &str = "PROFILE_UTC_OFFSET_MINUTES";

/// Account used when `GITHUB_USERNAME` is unset
pub const DEFAULT_USERNAME: &str = "octocat";

/// IST (UTC+05:30)
pub const DEFAULT_UTC_OFFSET_MINUTES: i32 = 330;

/// Errors in the process environment
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A required variable is absent or empty
    #[error("{0} is required but not set")]
    Missing(&'static str),

    /// A variable is set to something unusable
    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Process configuration derived from the environment
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    token: Option<String>,
    pub username: String,
    /// Whether `username` came from the environment rather than the default
    pub username_set: bool,
    pub api_base_url: String,
    pub utc_offset: FixedOffset,
}

impl Config {
    /// Reads configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads configuration through `lookup`, which maps a variable name to its value
    ///
    /// A missing credential is not an error here; commands that need it call
    /// [`Config::token`], so the fallback generator still works without one.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let utc_offset = match get(UTC_OFFSET_VAR) {
            Some(value) => parse_offset(&value).ok_or(ConfigError::Invalid {
                name: UTC_OFFSET_VAR,
                value,
            })?,
            None => FixedOffset::east_opt(DEFAULT_UTC_OFFSET_MINUTES * 60)
                .ok_or(ConfigError::Missing(UTC_OFFSET_VAR))?,
        };

        let username = get(USERNAME_VAR);

        Ok(Self {
            token: get(TOKEN_VAR),
            username_set: username.is_some(),
            username: username.unwrap_or_else(|| DEFAULT_USERNAME.to_string()),
            api_base_url: get(API_URL_VAR).unwrap_or_else(|| GITHUB_API_BASE_URL.to_string()),
            utc_offset,
        })
    }

    /// The access credential, or `ConfigError::Missing` if it was not provided
    pub fn token(&self) -> Result<&str, ConfigError> {
        self.token.as_deref().ok_or(ConfigError::Missing(TOKEN_VAR))
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// Fetcher settings for this environment
    pub fn fetcher_config(&self) -> Result<FetcherConfig, ConfigError> {
        Ok(FetcherConfig::new(self.token()?).with_base_url(&self.api_base_url))
    }
}

fn parse_offset(value: &str) -> Option<FixedOffset> {
    let minutes: i32 = value.parse().ok()?;
    FixedOffset::east_opt(minutes.checked_mul(60)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[(TOKEN_VAR, "secret")])).unwrap();

        assert_eq!(config.token(), Ok("secret"));
        assert_eq!(config.username, DEFAULT_USERNAME);
        assert!(!config.username_set);
        assert_eq!(config.api_base_url, GITHUB_API_BASE_URL);
        assert_eq!(config.utc_offset.local_minus_utc(), 330 * 60);
    }

    #[test]
    fn test_missing_token_reported_on_use() {
        let config = Config::from_lookup(lookup(&[])).unwrap();

        assert!(!config.has_token());
        assert_eq!(config.token(), Err(ConfigError::Missing(TOKEN_VAR)));
        assert!(config.fetcher_config().is_err());
    }

    #[test]
    fn test_empty_values_count_as_unset() {
        let config =
            Config::from_lookup(lookup(&[(TOKEN_VAR, "  "), (USERNAME_VAR, "")])).unwrap();

        assert!(config.token().is_err());
        assert_eq!(config.username, DEFAULT_USERNAME);
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            (TOKEN_VAR, "secret"),
            (USERNAME_VAR, "hubot"),
            (API_URL_VAR, "http://localhost:8080"),
            (UTC_OFFSET_VAR, "-300"),
        ]))
        .unwrap();

        assert_eq!(config.username, "hubot");
        assert!(config.username_set);
        assert_eq!(config.api_base_url, "http://localhost:8080");
        assert_eq!(config.utc_offset.local_minus_utc(), -300 * 60);

        let fetcher_config = config.fetcher_config().unwrap();
        assert_eq!(fetcher_config.base_url, "http://localhost:8080");
        assert_eq!(fetcher_config.token, "secret");
    }

    #[test]
    fn test_invalid_offset() {
        let err = Config::from_lookup(lookup(&[(UTC_OFFSET_VAR, "IST")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                name: UTC_OFFSET_VAR,
                value: "IST".to_string()
            }
        );

        // Out of chrono's ±24h range
        assert!(Config::from_lookup(lookup(&[(UTC_OFFSET_VAR, "100000")])).is_err());
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            ConfigError::Missing(TOKEN_VAR).to_string(),
            "GITHUB_TOKEN is required but not set"
        );
    }
}
