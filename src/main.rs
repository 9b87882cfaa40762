//! ghprofile - Generate a live, terminal-styled GitHub profile README
//!
//! Fetches recent activity, language statistics and the latest profile
//! commit from the GitHub API and renders them into a Markdown document.

use std::process::ExitCode;

use clap::Parser;

use ghprofile::app;
use ghprofile::cli::Cli;
use ghprofile::logging;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_tracing(&cli.log_level);

    match app::run(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "ghprofile failed");
            ExitCode::FAILURE
        }
    }
}
