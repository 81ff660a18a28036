//! Concierge command-line tool.

use clap::Parser;
use concierge::BookingClient;
use concierge::ObservabilityConfig;
use concierge::init_observability_with_config;
use std::process::ExitCode;

mod cli;

use cli::{Cli, load_config, run_command};

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    // Tokens may live in a local .env file
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    init_observability_with_config(
        ObservabilityConfig::new("concierge")
            .with_log_level(level)
            .with_json_logs(cli.json_logs),
    )?;

    let config = load_config(cli.config.as_deref())?;
    let client = BookingClient::new(config)?;

    let succeeded = run_command(&client, cli.command).await?;
    tracing::debug!(stats = ?client.metrics().snapshot(), "Finished");

    Ok(if succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
