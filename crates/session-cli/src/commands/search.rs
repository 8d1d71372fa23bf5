//! Search command - ranked search over content and snapshot metadata

use anyhow::Result;
use colored::Colorize;
use session_indexer::IndexerConfig;

use crate::cli::{Cli, OutputFormat, SearchFilters};
use crate::output::{colors, human, json};

pub async fn run(
    cli: &Cli,
    config: &IndexerConfig,
    query: &str,
    limit: usize,
    filters: &SearchFilters,
) -> Result<()> {
    let options = filters.search_options(limit)?;

    let index = super::build_index(cli, config).await?;
    let hits = index.search_with(query, &options);

    match cli.effective_format() {
        OutputFormat::Human => {
            if hits.is_empty() {
                println!("No results found for: {}", query.cyan());
            } else {
                println!(
                    "{}",
                    colors::header(&format!("Search results for '{}' ({})", query, hits.len()))
                );
                println!();
                for hit in &hits {
                    let session = index.sessions().get(hit.session_index);
                    println!("{}", human::format_match(hit, session, query));
                }
            }
            if index.report().timed_out {
                eprintln!("{}", colors::warning("index build timed out, results are partial"));
            }
        }
        OutputFormat::Json => {
            let values: Vec<_> = hits.iter().map(json::match_to_json).collect();
            json::print(&values)?;
        }
    }

    Ok(())
}
