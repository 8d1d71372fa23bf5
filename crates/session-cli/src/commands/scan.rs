//! Scan command - build the index and print the diagnostic report and corpus stats

use anyhow::Result;
use session_indexer::IndexerConfig;

use crate::cli::{Cli, OutputFormat};
use crate::output::{human, json};

pub async fn run(cli: &Cli, config: &IndexerConfig) -> Result<()> {
    let index = super::build_index(cli, config).await?;
    let stats = index.aggregate_stats();

    match cli.effective_format() {
        OutputFormat::Human => {
            for line in human::format_report(index.report()) {
                println!("{}", line);
            }
            println!();
            for line in human::format_stats(&stats) {
                println!("{}", line);
            }
        }
        OutputFormat::Json => json::print(&serde_json::json!({
            "report": index.report(),
            "stats": stats,
        }))?,
    }

    Ok(())
}
