//! umig CLI - Main entry point

use colored::Colorize;
use std::process;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};
use umig_cli::commands::{self, Context};
use umig_cli::config::{self, MigrationConfig};
use umig_cli::storage::ArchiveStore;
use umig_cli::{Cli, Commands};
use umig_common::logging::{init_logging, LogConfig, LogLevel, LogOutput};

use clap::Parser;

#[tokio::main]
async fn main() {
    // Parse command-line arguments
    let cli = Cli::parse();

    // .env may carry UMIG_LOG_* settings, so it is read before logging starts
    let dotenv = config::load_dotenv();

    let log_config = LogConfig::builder()
        .level(if cli.verbose { LogLevel::Debug } else { LogLevel::Warn })
        .output(LogOutput::Console)
        .log_file_prefix("umig")
        .build();

    // Environment variables take precedence over flags
    let log_config = match log_config.clone().merge_env() {
        Ok(Some(merged)) => merged,
        Ok(None) => log_config,
        Err(e) => {
            eprintln!("Warning: ignoring invalid logging environment: {}", e);
            log_config
        },
    };

    // The CLI keeps working without a subscriber
    let _ = init_logging(&log_config);

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, cancelling");
                cancel.cancel();
            }
        }
    });

    let result = match dotenv {
        Ok(Some(path)) => {
            debug!(path = %path.display(), "Loaded environment file");
            execute_command(&cli, cancel).await
        },
        Ok(None) => {
            warn!("No .env file found, using the process environment only");
            execute_command(&cli, cancel).await
        },
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        error!(error = %e, batch = ?e.failed_batch(), "Command failed");
        eprintln!("{} {}", "Error:".red().bold(), e);
        process::exit(1);
    }
}

/// Execute the CLI command
async fn execute_command(cli: &Cli, cancel: CancellationToken) -> umig_cli::Result<()> {
    let config = MigrationConfig::from_env()?;
    let store = ArchiveStore::new(&cli.archive);
    let ctx = Context {
        config: &config,
        store: &store,
        http_timeout: Duration::from_secs(cli.http_timeout_secs),
        cancel,
    };

    match &cli.command {
        Commands::Export(args) => commands::export::run(&ctx, args).await,
        Commands::Import(args) => commands::import::run(&ctx, args).await,
    }
}
