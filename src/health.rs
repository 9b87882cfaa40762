//! Pre-flight health check
//!
//! Verifies the environment, output permissions, GitHub API access, remaining
//! rate limit and general network reachability, then summarizes the results
//! into a JSON report.

use std::path::Path;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local, TimeZone, Utc};
use futures::future::join_all;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tempfile::NamedTempFile;

use crate::config::{Config, TOKEN_VAR};
use crate::data::fetcher::{ApiRequest, Fetcher};
use crate::data::retry::RetryPolicy;

pub const CHECK_ENVIRONMENT: &str = "Environment Variables";
pub const CHECK_FILESYSTEM: &str = "File System Permissions";
pub const CHECK_CONNECTION: &str = "GitHub API Connection";
pub const CHECK_RATE_LIMIT: &str = "Rate Limit Status";
pub const CHECK_NETWORK: &str = "Network Connectivity";

/// Requests that must remain for the rate limit to count as healthy
const RATE_LIMIT_HEALTHY_ABOVE: u64 = 50;

/// Share of endpoints that must be reachable
const NETWORK_HEALTHY_RATIO: f64 = 0.8;

/// Timeout for plain reachability probes
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Outcome of one check
#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    pub name: &'static str,
    pub success: bool,
    pub message: String,
    pub details: Value,
    /// Local wall-clock time the check finished (`HH:MM:SS`)
    pub timestamp: String,
}

impl CheckResult {
    fn new(name: &'static str, success: bool, message: impl Into<String>, details: Value) -> Self {
        Self {
            name,
            success,
            message: message.into(),
            details,
            timestamp: Local::now().format("%H:%M:%S").to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub passed: usize,
    pub total: usize,
    pub failed: usize,
}

/// Everything written to the health report file
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub timestamp: DateTime<Utc>,
    pub overall: bool,
    pub pass_rate: u32,
    pub duration_ms: u64,
    pub summary: Summary,
    pub checks: Vec<CheckResult>,
    pub recommendations: Vec<String>,
}

/// Required and optional variables are present
pub fn check_environment(config: &Config) -> CheckResult {
    let missing: Vec<&str> = if config.has_token() {
        Vec::new()
    } else {
        vec![TOKEN_VAR]
    };
    let optional_present = usize::from(config.username_set);
    let success = missing.is_empty();

    let message = if success {
        format!("All required variables present ({optional_present} optional)")
    } else {
        format!("Missing required variables: {}", missing.join(", "))
    };

    CheckResult::new(
        CHECK_ENVIRONMENT,
        success,
        message,
        json!({
            "required": 1,
            "missing": missing.len(),
            "optional": optional_present,
            "missingVars": missing,
        }),
    )
}

/// The output document and its directory are writable
pub fn check_file_permissions(output: &Path) -> CheckResult {
    let dir = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let result = (|| -> std::io::Result<()> {
        if let Ok(metadata) = std::fs::metadata(output) {
            if metadata.permissions().readonly() {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    format!("{} is read-only", output.display()),
                ));
            }
        }
        // Dropped (and removed) immediately
        NamedTempFile::new_in(dir)?;
        Ok(())
    })();

    match result {
        Ok(()) => CheckResult::new(
            CHECK_FILESYSTEM,
            true,
            "Read/write permissions verified",
            json!({"directory": dir.display().to_string()}),
        ),
        Err(e) => CheckResult::new(
            CHECK_FILESYSTEM,
            false,
            format!("Permission error: {e}"),
            json!({"directory": dir.display().to_string()}),
        ),
    }
}

#[derive(Debug, Deserialize)]
struct AuthenticatedUser {
    login: String,
    id: u64,
    #[serde(rename = "type", default)]
    kind: Option<String>,
}

/// The credential authenticates against `/user`
pub async fn check_connection(fetcher: Option<&Fetcher>) -> CheckResult {
    let Some(fetcher) = fetcher else {
        return CheckResult::new(
            CHECK_CONNECTION,
            false,
            format!("Failed to connect: {TOKEN_VAR} is not set"),
            Value::Null,
        );
    };

    let response = fetcher
        .fetch(&ApiRequest::new("/user"), &RetryPolicy::single_attempt())
        .await;

    match response.map(|r| serde_json::from_value::<AuthenticatedUser>(r.body)) {
        Ok(Ok(user)) => CheckResult::new(
            CHECK_CONNECTION,
            true,
            format!("Connected as {}", user.login),
            json!({"login": user.login, "id": user.id, "type": user.kind}),
        ),
        Ok(Err(e)) => CheckResult::new(
            CHECK_CONNECTION,
            false,
            format!("Failed to connect: unexpected response: {e}"),
            Value::Null,
        ),
        Err(e) => CheckResult::new(
            CHECK_CONNECTION,
            false,
            format!("Failed to connect: {e}"),
            json!({"kind": e.kind()}),
        ),
    }
}

#[derive(Debug, Deserialize)]
struct RateLimitResponse {
    rate: RateWindow,
}

#[derive(Debug, Deserialize)]
struct RateWindow {
    limit: u64,
    remaining: u64,
    reset: i64,
}

/// Judges a rate-limit window against the healthy threshold
fn evaluate_rate_limit(limit: u64, remaining: u64, reset: i64, now: DateTime<Utc>) -> CheckResult {
    let reset_at = Utc.timestamp_opt(reset, 0).single();
    let minutes_to_reset = reset_at.map(|t| (t - now).num_minutes());
    let healthy = remaining > RATE_LIMIT_HEALTHY_ABOVE;

    let message = if healthy {
        format!("{remaining}/{limit} requests remaining")
    } else {
        let resets = minutes_to_reset
            .map(|m| format!("resets in {m}m"))
            .unwrap_or_else(|| "reset time unknown".to_string());
        format!("Low rate limit: {remaining}/{limit} ({resets})")
    };

    CheckResult::new(
        CHECK_RATE_LIMIT,
        healthy,
        message,
        json!({
            "remaining": remaining,
            "limit": limit,
            "resetTime": reset_at.map(|t| t.to_rfc3339()),
            "minutesToReset": minutes_to_reset,
        }),
    )
}

/// Enough requests remain in the current window
pub async fn check_rate_limit(fetcher: Option<&Fetcher>) -> CheckResult {
    let Some(fetcher) = fetcher else {
        return CheckResult::new(
            CHECK_RATE_LIMIT,
            false,
            format!("Failed to check rate limit: {TOKEN_VAR} is not set"),
            Value::Null,
        );
    };

    let response = fetcher
        .fetch(&ApiRequest::new("/rate_limit"), &RetryPolicy::single_attempt())
        .await;

    match response.map(|r| serde_json::from_value::<RateLimitResponse>(r.body)) {
        Ok(Ok(body)) => evaluate_rate_limit(body.rate.limit, body.rate.remaining, body.rate.reset, Utc::now()),
        Ok(Err(e)) => CheckResult::new(
            CHECK_RATE_LIMIT,
            false,
            format!("Failed to check rate limit: unexpected response: {e}"),
            Value::Null,
        ),
        Err(e) => CheckResult::new(
            CHECK_RATE_LIMIT,
            false,
            format!("Failed to check rate limit: {e}"),
            json!({"kind": e.kind()}),
        ),
    }
}

/// At least 80% of `urls` answer at all, whatever the status
pub async fn check_network(urls: &[String]) -> CheckResult {
    let client = match Client::builder().timeout(PROBE_TIMEOUT).build() {
        Ok(client) => client,
        Err(e) => {
            return CheckResult::new(
                CHECK_NETWORK,
                false,
                format!("Failed to build HTTP client: {e}"),
                Value::Null,
            )
        }
    };

    let probes = urls.iter().map(|url| {
        let client = &client;
        async move {
            match client.get(url).send().await {
                Ok(_) => json!({"url": url, "success": true}),
                Err(e) => json!({"url": url, "success": false, "error": e.to_string()}),
            }
        }
    });
    let results = join_all(probes).await;

    let successful = results.iter().filter(|r| r["success"] == json!(true)).count();
    let total = urls.len();
    let required = (total as f64 * NETWORK_HEALTHY_RATIO).ceil() as usize;
    let success_rate = if total == 0 { 0 } else { successful * 100 / total };

    CheckResult::new(
        CHECK_NETWORK,
        total > 0 && successful >= required,
        format!("{successful}/{total} endpoints reachable"),
        json!({
            "successful": successful,
            "total": total,
            "successRate": success_rate,
            "results": results,
        }),
    )
}

/// One remediation hint per failed check, without duplicates
pub fn recommendations(checks: &[CheckResult]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for check in checks.iter().filter(|c| !c.success) {
        let hint = match check.name {
            CHECK_CONNECTION => "Verify GITHUB_TOKEN is valid and has required permissions",
            CHECK_RATE_LIMIT => "Wait for rate limit reset or use a different token",
            CHECK_ENVIRONMENT => "Set missing environment variables in GitHub Secrets",
            CHECK_FILESYSTEM => "Check repository permissions and workflow token scope",
            CHECK_NETWORK => "Check network connectivity and firewall settings",
            _ => continue,
        };
        if !out.iter().any(|existing| existing == hint) {
            out.push(hint.to_string());
        }
    }
    out
}

/// Builds the report from finished checks
pub fn summarize(checks: Vec<CheckResult>, started_at: DateTime<Utc>, duration: Duration) -> HealthReport {
    let total = checks.len();
    let passed = checks.iter().filter(|c| c.success).count();
    let pass_rate = if total == 0 {
        0
    } else {
        ((passed as f64 / total as f64) * 100.0).round() as u32
    };

    HealthReport {
        timestamp: started_at,
        overall: passed == total,
        pass_rate,
        duration_ms: duration.as_millis() as u64,
        summary: Summary {
            passed,
            total,
            failed: total - passed,
        },
        recommendations: recommendations(&checks),
        checks,
    }
}

/// Guidance line(s) for a pass rate
pub fn advice(pass_rate: u32) -> &'static [&'static str] {
    match pass_rate {
        100 => &["All systems optimal. Ready for README generation."],
        80..=99 => &[
            "Most systems healthy. Minor issues detected.",
            "README generation should work with fallback support.",
        ],
        60..=79 => &[
            "Multiple issues detected. Address critical failures.",
            "Fallback mode recommended.",
        ],
        _ => &[
            "Critical system issues. Immediate attention required.",
            "README generation may fail completely.",
        ],
    }
}

/// Runs every check concurrently
///
/// `fetcher` is `None` when no credential is configured; the API checks then
/// fail without touching the network.
pub async fn run_checks(
    config: &Config,
    fetcher: Option<&Fetcher>,
    output: &Path,
    probe_urls: &[String],
) -> HealthReport {
    let started_at = Utc::now();
    let started = Instant::now();

    let environment = check_environment(config);
    let filesystem = check_file_permissions(output);
    let (network, connection, rate_limit) = tokio::join!(
        check_network(probe_urls),
        check_connection(fetcher),
        check_rate_limit(fetcher)
    );

    summarize(
        vec![environment, filesystem, network, connection, rate_limit],
        started_at,
        started.elapsed(),
    )
}

/// Human-readable summary printed after the checks
pub fn render_summary(report: &HealthReport) -> String {
    let mut lines = Vec::new();
    for check in &report.checks {
        let status = if check.success { "PASS" } else { "FAIL" };
        lines.push(format!("[{status}] {}: {}", check.name, check.message));
    }
    lines.push(String::new());
    lines.push("HEALTH CHECK SUMMARY".to_string());
    lines.push(format!(
        "Passed: {}/{} ({}%)",
        report.summary.passed, report.summary.total, report.pass_rate
    ));
    lines.push(format!("Duration: {}ms", report.duration_ms));
    lines.push(format!(
        "Overall: {}",
        if report.overall { "HEALTHY" } else { "ISSUES DETECTED" }
    ));

    if !report.overall {
        lines.push(String::new());
        lines.push("ISSUES FOUND:".to_string());
        for check in report.checks.iter().filter(|c| !c.success) {
            lines.push(format!("  - {}: {}", check.name, check.message));
        }
    }

    lines.push(String::new());
    lines.push("RECOMMENDATIONS:".to_string());
    for line in advice(report.pass_rate) {
        lines.push(format!("  - {line}"));
    }
    for line in &report.recommendations {
        lines.push(format!("  - {line}"));
    }

    lines.join("\n")
}
