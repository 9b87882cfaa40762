//! GitHub REST API fetcher
//!
//! Issues authenticated GET requests, classifies failures into a small
//! taxonomy and retries the retryable ones with exponential backoff.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, InvalidHeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use thiserror::Error;

use super::rate_limit::RateLimitState;
use super::retry::{retry, RetryPolicy};

/// Default base URL for the GitHub REST API
pub const GITHUB_API_BASE_URL: &str = "https://api.github.com";

/// Versioned media type pinned on every request
const GITHUB_MEDIA_TYPE: &str = "application/vnd.github.v3+json";

/// Fixed per-request deadline
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors that can occur when fetching from the API
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// Quota exhausted; wait until `reset_at` before trying again
    #[error("rate limited by GitHub (resets at {})", display_reset(.reset_at))]
    RateLimited { reset_at: Option<DateTime<Utc>> },

    /// The resource does not exist
    #[error("not found: {path}")]
    NotFound { path: String },

    /// GitHub answered with a 5xx status
    #[error("server error: HTTP {status}")]
    ServerError { status: u16 },

    /// The request exceeded its deadline
    #[error("request timed out")]
    Timeout,

    /// Any other transport failure or unexpected response
    #[error("request failed: {0}")]
    Unknown(String),
}

fn display_reset(reset_at: &Option<DateTime<Utc>>) -> String {
    reset_at
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| "an unknown time".to_string())
}

impl FetchError {
    /// Whether another attempt could plausibly succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FetchError::ServerError { .. } | FetchError::Timeout | FetchError::Unknown(_)
        )
    }

    /// Short classification name used in log fields
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::RateLimited { .. } => "rate_limited",
            FetchError::NotFound { .. } => "not_found",
            FetchError::ServerError { .. } => "server_error",
            FetchError::Timeout => "timeout",
            FetchError::Unknown(_) => "unknown",
        }
    }

    fn from_transport(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Unknown(error.to_string())
        }
    }
}

/// Errors that can occur while building the HTTP client
#[derive(Debug, Error)]
pub enum ClientBuildError {
    /// The credential cannot be sent as a header
    #[error("access token is not a valid header value")]
    InvalidCredential(#[from] InvalidHeaderValue),

    /// reqwest refused the client configuration
    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

/// A logical API query: path plus query parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    /// Path below the API base URL, starting with `/`
    pub path: String,
    /// Query parameters in the order they are sent
    pub query: Vec<(String, String)>,
}

impl ApiRequest {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            query: Vec::new(),
        }
    }

    pub fn query(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((name.into(), value.to_string()));
        self
    }

    /// Cache key: path plus query parameters sorted by name
    ///
    /// Two requests that differ only in parameter order share a key.
    pub fn cache_key(&self) -> String {
        if self.query.is_empty() {
            return self.path.clone();
        }
        let mut params: Vec<&(String, String)> = self.query.iter().collect();
        params.sort();
        let query = params
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("&");
        format!("{}?{}", self.path, query)
    }
}

/// A successful response
#[derive(Debug, Clone)]
pub struct ApiResponse {
    /// Decoded JSON body
    pub body: Value,
    /// Rate-limit headers carried by the response, if any
    pub rate_limit: Option<RateLimitState>,
}

/// Connection settings for the fetcher
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    pub base_url: String,
    pub token: String,
    pub user_agent: String,
    pub timeout: Duration,
}

impl FetcherConfig {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            base_url: GITHUB_API_BASE_URL.to_string(),
            token: token.into(),
            user_agent: format!("ghprofile/{}", env!("CARGO_PKG_VERSION")),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Client for single logical retrievals against the GitHub API
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    base_url: String,
}

impl Fetcher {
    /// Creates a fetcher that sends the credential, media type and user agent
    /// on every request and enforces the configured timeout
    pub fn new(config: &FetcherConfig) -> Result<Self, ClientBuildError> {
        let mut authorization = HeaderValue::from_str(&format!("token {}", config.token))?;
        authorization.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, authorization);
        headers.insert(ACCEPT, HeaderValue::from_static(GITHUB_MEDIA_TYPE));
        headers.insert(USER_AGENT, HeaderValue::from_str(&config.user_agent)?);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Base URL requests are resolved against
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetches `request`, retrying retryable failures per `policy`
    ///
    /// # Returns
    /// * `Ok(ApiResponse)` - decoded body plus rate-limit headers
    /// * `Err(FetchError)` - after a non-retryable failure or once attempts are exhausted
    pub async fn fetch(
        &self,
        request: &ApiRequest,
        policy: &RetryPolicy,
    ) -> Result<ApiResponse, FetchError> {
        retry(policy, &request.path, FetchError::is_retryable, || {
            self.fetch_once(request)
        })
        .await
    }

    /// Performs exactly one HTTP round trip and classifies the outcome
    pub async fn fetch_once(&self, request: &ApiRequest) -> Result<ApiResponse, FetchError> {
        let url = format!("{}{}", self.base_url, request.path);

        let response = self
            .client
            .get(&url)
            .query(&request.query)
            .send()
            .await
            .map_err(FetchError::from_transport)?;

        let rate_limit = RateLimitState::from_headers(response.headers());
        classify_status(response.status(), rate_limit, &request.path)?;

        let body = response
            .json::<Value>()
            .await
            .map_err(FetchError::from_transport)?;

        Ok(ApiResponse { body, rate_limit })
    }
}

/// Maps a non-success status to its failure classification
fn classify_status(
    status: StatusCode,
    rate_limit: Option<RateLimitState>,
    path: &str,
) -> Result<(), FetchError> {
    let quota_exhausted = rate_limit.is_some_and(|state| state.is_exhausted());
    let reset_at = rate_limit.and_then(|state| state.reset_at);

    if status.is_success() {
        Ok(())
    } else if status == StatusCode::NOT_FOUND {
        Err(FetchError::NotFound {
            path: path.to_string(),
        })
    } else if status == StatusCode::TOO_MANY_REQUESTS
        || (status == StatusCode::FORBIDDEN && quota_exhausted)
    {
        Err(FetchError::RateLimited { reset_at })
    } else if status.is_server_error() {
        Err(FetchError::ServerError {
            status: status.as_u16(),
        })
    } else {
        Err(FetchError::Unknown(format!("unexpected status {status}")))
    }
}
