//! lastfm-nostr-status - one check-and-broadcast run per invocation.
//!
//! Exits 0 when the run completes, including when there is nothing new to
//! announce or some relays fail. Exits 1 on configuration errors, exhausted
//! store or feed retries, and signing failures.

use std::process::ExitCode;

use chrono::Utc;
use clap::Parser;
use lastfm_nostr_status::{Cli, Orchestrator, RunError, RunOutcome};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.show_version {
        println!("{}", env!("CARGO_PKG_VERSION"));
        return ExitCode::SUCCESS;
    }

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("lastfm_nostr_status=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(outcome) => {
            if let RunOutcome::Broadcast { status, report } = outcome {
                tracing::info!(
                    %status,
                    published = report.published(),
                    attempted = report.attempted(),
                    "Run finished"
                );
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Run failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<RunOutcome, RunError> {
    let config = cli.into_config()?;
    tracing::debug!(
        user = %config.lastfm_user,
        database = %config.database.display(),
        relays = config.relays.len(),
        "Configuration loaded"
    );

    let orchestrator = Orchestrator::from_config(&config)?;
    orchestrator.run(Utc::now()).await
}
