//! CLI command implementations

pub mod export;
pub mod list;
pub mod scan;
pub mod search;

use anyhow::{Context, Result};
use session_indexer::{IndexerConfig, ScanProgress, SessionIndex};
use tokio::sync::mpsc;

use crate::cli::{Cli, OutputFormat};

/// Build the index, drawing a progress line on stderr when it is a terminal
pub async fn build_index(cli: &Cli, config: &IndexerConfig) -> Result<SessionIndex> {
    let show_progress =
        cli.effective_format() == OutputFormat::Human && atty::is(atty::Stream::Stderr);
    if !show_progress {
        return SessionIndex::build(config)
            .await
            .context("Failed to build session index");
    }

    let (tx, mut rx) = mpsc::unbounded_channel::<ScanProgress>();
    let printer = tokio::spawn(async move {
        let mut drew = false;
        while let Some(progress) = rx.recv().await {
            eprint!(
                "\rScanning... {} files in {} directories",
                progress.files_found, progress.directories_visited
            );
            drew = true;
        }
        if drew {
            eprintln!();
        }
    });

    let index = SessionIndex::build_with_progress(config, Some(tx)).await;
    // sender is dropped with the scanner, which ends the printer
    let _ = printer.await;
    index.context("Failed to build session index")
}
