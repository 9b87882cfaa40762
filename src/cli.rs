//! Command-line interface parsing for ghprofile
//!
//! This module handles parsing of CLI arguments using clap: the `generate`
//! (default), `health` and `fallback` subcommands and their tunables.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use thiserror::Error;

use crate::data::client::{ClientSettings, MAX_FAN_OUT};
use crate::data::rate_limit::DEFAULT_LOW_WATER;
use crate::data::retry::{RetryPolicy, DEFAULT_MAX_ATTEMPTS};

/// Default output document
pub const DEFAULT_OUTPUT: &str = "README.md";

/// Default health report path
pub const DEFAULT_HEALTH_REPORT: &str = ".health-report.json";

/// Default cache TTL in seconds
const DEFAULT_CACHE_TTL_SECS: u64 = 300;

/// Error types for CLI argument parsing
#[derive(Debug, Error)]
pub enum CliError {
    /// Fan-out outside the permitted range
    #[error("Invalid fan-out: '{0}'. Expected a number from 1 to 10")]
    InvalidFanOut(String),
}

/// ghprofile - Generate a live, terminal-styled GitHub profile README
#[derive(Parser, Debug)]
#[command(name = "ghprofile")]
#[command(about = "Generate a live, terminal-styled GitHub profile README")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Log level used when RUST_LOG is not set (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info", value_name = "LEVEL")]
    pub log_level: String,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Fetch profile data from GitHub and write the live document (default)
    Generate(GenerateArgs),
    /// Check configuration, permissions and GitHub API health
    Health(HealthArgs),
    /// Write the static fallback-mode document
    Fallback(FallbackArgs),
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct GenerateArgs {
    /// Document to write
    #[arg(short, long, default_value = DEFAULT_OUTPUT)]
    pub output: PathBuf,

    /// Attempts per API request, including the first
    #[arg(long, default_value_t = DEFAULT_MAX_ATTEMPTS)]
    pub max_attempts: u32,

    /// Maximum simultaneous requests when fetching per-repository data
    #[arg(long, default_value_t = MAX_FAN_OUT, value_parser = parse_fan_out)]
    pub fan_out: usize,

    /// Seconds a cached response stays fresh
    #[arg(long, default_value_t = DEFAULT_CACHE_TTL_SECS)]
    pub cache_ttl_secs: u64,
}

impl Default for GenerateArgs {
    fn default() -> Self {
        Self {
            output: PathBuf::from(DEFAULT_OUTPUT),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            fan_out: MAX_FAN_OUT,
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
        }
    }
}

impl GenerateArgs {
    /// Client tunables selected by these arguments
    pub fn client_settings(&self) -> ClientSettings {
        ClientSettings {
            retry: RetryPolicy::default().with_max_attempts(self.max_attempts),
            cache_ttl: Duration::from_secs(self.cache_ttl_secs),
            fan_out: self.fan_out,
            low_water: DEFAULT_LOW_WATER,
        }
    }
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct HealthArgs {
    /// Where to write the JSON health report
    #[arg(long, default_value = DEFAULT_HEALTH_REPORT)]
    pub report: PathBuf,

    /// Document whose directory must be writable
    #[arg(short, long, default_value = DEFAULT_OUTPUT)]
    pub output: PathBuf,
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct FallbackArgs {
    /// Error detail shown in the document
    pub message: Option<String>,

    /// Document to write
    #[arg(short, long, default_value = DEFAULT_OUTPUT)]
    pub output: PathBuf,
}

impl Cli {
    /// The selected subcommand, `generate` with defaults when none was given
    pub fn command(&self) -> Command {
        self.command
            .clone()
            .unwrap_or_else(|| Command::Generate(GenerateArgs::default()))
    }
}

/// Parses a fan-out argument into a width in `1..=MAX_FAN_OUT`
///
/// # Returns
/// * `Ok(usize)` if the string is a number in range
/// * `Err(CliError::InvalidFanOut)` otherwise
pub fn parse_fan_out(s: &str) -> Result<usize, CliError> {
    s.trim()
        .parse::<usize>()
        .ok()
        .filter(|n| (1..=MAX_FAN_OUT).contains(n))
        .ok_or_else(|| CliError::InvalidFanOut(s.to_string()))
}
