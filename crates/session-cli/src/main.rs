//! session-cli - scan, correlate and search Claude Code sessions

mod cli;
mod commands;
mod output;

use anyhow::{Context, Result};
use clap::Parser;
use std::time::Duration;
use tokio::runtime::Runtime;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command};

/// Logs go to stderr so JSON on stdout stays clean
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// How long exit waits for blocking filesystem work abandoned at the deadline
const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

fn build_runtime() -> Result<Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")
}

async fn run(cli: &Cli) -> Result<()> {
    let config = cli.indexer_config()?;

    match &cli.command {
        Command::Scan => commands::scan::run(cli, &config).await,
        Command::List { limit } => commands::list::run(cli, &config, *limit).await,
        Command::Search { query, limit, filters } => {
            commands::search::run(cli, &config, query, *limit, filters).await
        }
        Command::Export { format, output } => {
            commands::export::run(cli, &config, *format, output.as_deref()).await
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let runtime = build_runtime()?;
    let result = runtime.block_on(run(&cli));
    // A plain drop would wait on any blocking task still stuck in a hung mount
    runtime.shutdown_timeout(SHUTDOWN_GRACE);
    result
}
