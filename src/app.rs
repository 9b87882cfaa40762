//! Command execution for ghprofile
//!
//! Wires configuration, the cached GitHub client, rendering and document
//! output together for each subcommand.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::Utc;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::cli::{Cli, Command, FallbackArgs, GenerateArgs, HealthArgs};
use crate::config::{Config, ConfigError};
use crate::data::client::GitHubClient;
use crate::data::fetcher::{ClientBuildError, Fetcher, GITHUB_API_BASE_URL};
use crate::data::ProfileData;
use crate::health;
use crate::readme::{
    render_fallback, render_minimal, render_profile, write_document, DEFAULT_FALLBACK_MESSAGE,
};

/// Reachability probe targets besides the configured API base
const GITHUB_WEB_URL: &str = "https://github.com";

/// Fatal errors that end a run with a non-zero exit code
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Client(#[from] ClientBuildError),

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode health report: {0}")]
    Report(#[from] serde_json::Error),
}

/// Which document a generation run produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    /// Live document; `degraded` lists sources shown as placeholders
    Live { degraded: Vec<&'static str> },
    /// Every source failed, the fallback document was written instead
    Fallback { reason: String },
}

/// Runs the selected subcommand
pub async fn run(cli: Cli) -> Result<ExitCode, AppError> {
    let config = Config::from_env()?;

    match cli.command() {
        Command::Generate(args) => {
            match generate(&config, &args).await? {
                GenerationOutcome::Live { degraded } if degraded.is_empty() => {
                    info!("generation complete")
                }
                GenerationOutcome::Live { degraded } => {
                    info!(degraded = ?degraded, "generation complete in degraded mode")
                }
                GenerationOutcome::Fallback { reason } => {
                    info!(reason = %reason, "generation complete in fallback mode")
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Health(args) => health(&config, &args).await,
        Command::Fallback(args) => {
            fallback(&config, &args)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Fetches profile data and writes the live document
///
/// Fails before any network call when no credential is configured. When no
/// data source could be served, the fallback document is written instead and
/// the run still succeeds.
pub async fn generate(config: &Config, args: &GenerateArgs) -> Result<GenerationOutcome, AppError> {
    let fetcher = Fetcher::new(&config.fetcher_config()?)?;
    let client = GitHubClient::new(fetcher, config.username.clone(), args.client_settings());

    info!(username = %client.username(), output = %args.output.display(), "generating profile");
    let data = client.profile().await;

    if data.all_sources_failed() {
        let reason = first_failure(&data);
        warn!(reason = %reason, "every data source failed, writing fallback document");
        let document = render_fallback(client.username(), &reason, Utc::now(), config.utc_offset);
        write(&args.output, &document)?;
        return Ok(GenerationOutcome::Fallback { reason });
    }

    let document = render_profile(&data, config.utc_offset);
    write(&args.output, &document)?;

    let degraded: Vec<&'static str> = data.failed_sources.iter().map(|f| f.source).collect();
    if degraded.is_empty() {
        info!(output = %args.output.display(), "profile written");
    } else {
        warn!(output = %args.output.display(), degraded = ?degraded, "profile written with placeholders");
    }
    Ok(GenerationOutcome::Live { degraded })
}

fn first_failure(data: &ProfileData) -> String {
    data.failed_sources
        .first()
        .map(|failure| failure.error.to_string())
        .unwrap_or_else(|| DEFAULT_FALLBACK_MESSAGE.to_string())
}

/// Runs the health checks, prints the summary and writes the JSON report
pub async fn health(config: &Config, args: &HealthArgs) -> Result<ExitCode, AppError> {
    // A credential that cannot be sent is reported by the checks, not fatal
    let fetcher = match config.fetcher_config() {
        Ok(fetcher_config) => Fetcher::new(&fetcher_config)
            .map_err(|e| warn!(error = %e, "cannot build API client for health checks"))
            .ok(),
        Err(_) => None,
    };

    let mut probe_urls = vec![config.api_base_url.clone()];
    if config.api_base_url.trim_end_matches('/') == GITHUB_API_BASE_URL {
        probe_urls.push(GITHUB_WEB_URL.to_string());
    }

    let report = health::run_checks(config, fetcher.as_ref(), &args.output, &probe_urls).await;
    println!("{}", health::render_summary(&report));

    let json = serde_json::to_string_pretty(&report)?;
    write(&args.report, &json)?;
    info!(report = %args.report.display(), overall = report.overall, "health report written");

    Ok(if report.overall {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Writes the fallback document
///
/// If that fails, the minimal document is attempted and the original error
/// is still returned.
pub fn fallback(config: &Config, args: &FallbackArgs) -> Result<(), AppError> {
    let message = args.message.as_deref().unwrap_or(DEFAULT_FALLBACK_MESSAGE);
    let document = render_fallback(&config.username, message, Utc::now(), config.utc_offset);

    if let Err(e) = write(&args.output, &document) {
        error!(error = %e, "fallback generation failed, writing minimal document");
        if let Err(minimal) = write(&args.output, &render_minimal(&config.username)) {
            error!(error = %minimal, "minimal document could not be written either");
        }
        return Err(e);
    }

    info!(output = %args.output.display(), "fallback document written");
    Ok(())
}

fn write(path: &Path, contents: &str) -> Result<(), AppError> {
    write_document(path, contents).map_err(|source| AppError::Write {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{API_URL_VAR, TOKEN_VAR};
    use crate::readme::fallback::FALLBACK_MODE_MARKER;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_without_token() -> Config {
        Config::from_lookup(|_| None).unwrap()
    }

    #[tokio::test]
    async fn test_generate_without_token_fails_fast() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let args = GenerateArgs {
            output: temp_dir.path().join("README.md"),
            ..GenerateArgs::default()
        };

        let err = generate(&config_without_token(), &args).await.unwrap_err();
        assert!(matches!(err, AppError::Config(ConfigError::Missing(TOKEN_VAR))));
        assert!(!args.output.exists());
    }

    fn config_for(server: &MockServer) -> Config {
        let api_url = server.uri();
        Config::from_lookup(move |name| match name {
            TOKEN_VAR => Some("test-token".to_string()),
            API_URL_VAR => Some(api_url.clone()),
            _ => None,
        })
        .unwrap()
    }

    fn fast_args(output: PathBuf) -> GenerateArgs {
        GenerateArgs {
            output,
            max_attempts: 1,
            ..GenerateArgs::default()
        }
    }

    #[tokio::test]
    async fn test_generate_reports_degraded_sources() {
        let server = MockServer::start().await;
        for route in ["/users/octocat/events/public", "/repos/octocat/octocat/commits"] {
            Mock::given(method("GET"))
                .and(path(route))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
                .mount(&server)
                .await;
        }
        Mock::given(method("GET"))
            .and(path("/users/octocat/repos"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let args = fast_args(temp_dir.path().join("README.md"));

        let outcome = generate(&config_for(&server), &args).await.unwrap();

        assert_eq!(outcome, GenerationOutcome::Live { degraded: vec!["languages"] });
        let written = fs::read_to_string(&args.output).unwrap();
        assert!(written.contains("degraded (languages)"));
    }

    #[tokio::test]
    async fn test_generate_switches_to_fallback_when_every_source_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let args = fast_args(temp_dir.path().join("README.md"));

        let outcome = generate(&config_for(&server), &args).await.unwrap();

        let GenerationOutcome::Fallback { reason } = outcome else {
            panic!("expected fallback outcome, got {outcome:?}");
        };
        assert!(reason.starts_with("not found"), "reason: {reason}");
        let written = fs::read_to_string(&args.output).unwrap();
        assert!(written.contains(FALLBACK_MODE_MARKER));
        assert!(written.contains(&reason));
    }

    #[test]
    fn test_fallback_writes_document() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let args = FallbackArgs {
            message: Some("API down".to_string()),
            output: temp_dir.path().join("README.md"),
        };

        fallback(&config_without_token(), &args).unwrap();

        let written = fs::read_to_string(&args.output).unwrap();
        assert!(written.contains(FALLBACK_MODE_MARKER));
        assert!(written.contains("API down"));
    }

    #[test]
    fn test_fallback_into_missing_directory_fails() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let args = FallbackArgs {
            message: None,
            output: temp_dir.path().join("missing").join("README.md"),
        };

        let err = fallback(&config_without_token(), &args).unwrap_err();
        assert!(matches!(err, AppError::Write { .. }));
        assert!(!args.output.exists());
    }

    #[test]
    fn test_write_error_names_path() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("missing").join("README.md");

        let err = write(&path, "x").unwrap_err();
        assert!(err.to_string().contains("missing"));
    }
}
