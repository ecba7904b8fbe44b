use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use tasks_client::config::{Config, LogFormat};
use tasks_client::TasksApi;

mod cli;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env before clap reads the environment
    dotenvy::dotenv().ok();

    let cli = cli::Cli::parse();

    let config = Config::from_args(&cli.connection)?;
    config.validate()?;

    init_logging(&config);

    tracing::debug!(
        api_url = %config.api_url,
        token_db = ?config.token_db,
        "Configuration loaded"
    );

    let api = TasksApi::connect(&config)?;

    // Ctrl+C aborts whatever request is in flight
    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Received Ctrl+C signal, cancelling...");
                cancel.cancel();
            }
        }
    });

    cli::run(cli.command, api.with_cancellation(cancel)).await
}

/// Initialize logging on stderr; stdout carries command output
fn init_logging(config: &Config) {
    let log_level = config.log_level.to_lowercase();
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level));

    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_file(true)
            .with_line_number(true)
            .with_writer(std::io::stderr)
            .init(),
    }
}
