//! Export command - write indexed sessions as Markdown or JSON

use anyhow::{Context, Result};
use session_core::Session;
use session_indexer::IndexerConfig;
use std::path::Path;

use crate::cli::{Cli, ExportFormat};
use crate::output::markdown;

pub async fn run(
    cli: &Cli,
    config: &IndexerConfig,
    format: ExportFormat,
    output: Option<&Path>,
) -> Result<()> {
    let index = super::build_index(cli, config).await?;

    let mut sessions: Vec<&Session> = index.sessions().iter().collect();
    sessions.sort_by(|a, b| b.modified_at.cmp(&a.modified_at));

    let rendered = match format {
        ExportFormat::Markdown => markdown::sessions_to_markdown(&sessions),
        ExportFormat::Json => serde_json::to_string_pretty(&sessions)?,
    };

    match output {
        Some(path) => tokio::fs::write(path, rendered)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => println!("{}", rendered),
    }

    if index.report().timed_out {
        eprintln!("index build timed out, export is partial");
    }
    Ok(())
}
