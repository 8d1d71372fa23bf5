//! List command - show indexed sessions, most recently modified first

use anyhow::Result;
use session_core::Session;
use session_indexer::IndexerConfig;

use crate::cli::{Cli, OutputFormat};
use crate::output::{colors, human, json};

pub async fn run(cli: &Cli, config: &IndexerConfig, limit: usize) -> Result<()> {
    let index = super::build_index(cli, config).await?;

    let mut sessions: Vec<&Session> = index.sessions().iter().collect();
    sessions.sort_by(|a, b| b.modified_at.cmp(&a.modified_at));
    sessions.truncate(limit);

    match cli.effective_format() {
        OutputFormat::Human => {
            if sessions.is_empty() {
                println!("No sessions found");
            } else {
                println!(
                    "{}",
                    colors::header(&format!(
                        "Sessions ({} of {})",
                        sessions.len(),
                        colors::format_count(index.len())
                    ))
                );
                println!();
                for session in &sessions {
                    println!("{}", human::format_session(session));
                }
            }
            if index.report().timed_out {
                eprintln!("{}", colors::warning("index build timed out, list is partial"));
            }
        }
        OutputFormat::Json => {
            let values: Vec<_> = sessions.iter().map(|s| json::session_to_json(s)).collect();
            json::print(&values)?;
        }
    }

    Ok(())
}
