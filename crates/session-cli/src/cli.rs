//! CLI argument definitions

use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use session_core::{ProgrammingLanguage, Role};
use session_indexer::config::expand_home;
use session_indexer::{IndexerConfig, SearchOptions};
use std::path::PathBuf;
use std::time::Duration;

/// Scan, correlate and search Claude Code sessions
#[derive(Parser, Debug)]
#[command(name = "sessions")]
#[command(author = "Claude Code SDK")]
#[command(version)]
#[command(about = "Scan, correlate and search Claude Code sessions")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Corpus root to scan (repeatable)
    #[arg(long = "root", global = true, env = "SESSIONS_ROOT", value_delimiter = ',')]
    pub roots: Vec<PathBuf>,

    /// tmux-resurrect snapshot directory
    #[arg(long, global = true, env = "SESSIONS_SNAPSHOT_DIR")]
    pub snapshots: Option<PathBuf>,

    /// Skip snapshot correlation (overrides --snapshots)
    #[arg(long, global = true)]
    pub no_snapshots: bool,

    /// TOML config file
    #[arg(long, global = true, env = "SESSIONS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Overall timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Output format (auto-detects based on TTY if not specified)
    #[arg(long, short = 'f', global = true)]
    pub format: Option<OutputFormat>,

    /// Log debug output to stderr
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format for commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output with colors
    Human,
    /// JSON output
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build the index and print the scan report
    Scan,

    /// List indexed sessions
    List {
        /// Number of sessions to show
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,
    },

    /// Ranked search over content and snapshot metadata
    Search {
        /// Search query
        query: String,

        /// Limit results
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,

        #[command(flatten)]
        filters: SearchFilters,
    },

    /// Export indexed sessions, most recently modified first
    Export {
        /// Export format
        #[arg(id = "export_format", long = "as", value_enum, default_value = "markdown")]
        format: ExportFormat,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Markdown,
    Json,
}

/// Content filters for `search`
#[derive(Args, Debug, Default)]
pub struct SearchFilters {
    /// Only content from these roles (user, assistant, system, tool)
    #[arg(short, long, value_delimiter = ',')]
    pub role: Option<Vec<String>>,

    /// Only blocks with code in these languages (rust, py, ts, ...)
    #[arg(long = "lang", value_delimiter = ',')]
    pub languages: Option<Vec<String>>,

    /// Only blocks tagged with these topics
    #[arg(long = "topic", value_delimiter = ',')]
    pub topics: Option<Vec<String>>,

    /// Only blocks invoking these tools
    #[arg(long = "tool", value_delimiter = ',')]
    pub tools: Option<Vec<String>>,

    /// Only blocks with (true) or without (false) code
    #[arg(long)]
    pub has_code: Option<bool>,

    /// Earliest day to include (YYYY-MM-DD, UTC)
    #[arg(long)]
    pub since: Option<NaiveDate>,

    /// Last day to include (YYYY-MM-DD, UTC)
    #[arg(long)]
    pub until: Option<NaiveDate>,
}

impl SearchFilters {
    pub fn search_options(&self, limit: usize) -> Result<SearchOptions> {
        let mut options = SearchOptions::new().with_limit(limit);
        if let Some(labels) = &self.role {
            options = options.with_roles(parse_roles(labels)?);
        }
        if let Some(tags) = &self.languages {
            options = options.with_languages(
                tags.iter().map(|t| ProgrammingLanguage::from_tag(t)).collect(),
            );
        }
        if let Some(topics) = &self.topics {
            options = options.with_topics(topics.clone());
        }
        if let Some(tools) = &self.tools {
            options = options.with_tools(tools.clone());
        }
        if let Some(has_code) = self.has_code {
            options = options.with_has_code(has_code);
        }
        if self.since.is_some() || self.until.is_some() {
            let start = self.since.map_or(DateTime::<Utc>::MIN_UTC, start_of_day);
            let end = match self.until {
                Some(day) => day
                    .succ_opt()
                    .map_or(DateTime::<Utc>::MAX_UTC, |next| {
                        start_of_day(next) - chrono::Duration::nanoseconds(1)
                    }),
                None => DateTime::<Utc>::MAX_UTC,
            };
            if start > end {
                bail!("--since must not be after --until");
            }
            options = options.with_date_range(start, end);
        }
        Ok(options)
    }
}

fn start_of_day(day: NaiveDate) -> DateTime<Utc> {
    day.and_time(chrono::NaiveTime::MIN).and_utc()
}

impl Cli {
    /// Get the effective output format
    pub fn effective_format(&self) -> OutputFormat {
        if let Some(f) = self.format {
            return f;
        }
        if atty::is(atty::Stream::Stdout) {
            OutputFormat::Human
        } else {
            OutputFormat::Json
        }
    }

    /// Config file first, then command-line overrides
    pub fn indexer_config(&self) -> Result<IndexerConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let path = expand_home(path);
                IndexerConfig::from_toml_file(&path)
                    .with_context(|| format!("Failed to load config from {}", path.display()))?
            }
            None => IndexerConfig::default(),
        };

        if !self.roots.is_empty() {
            config = config.with_roots(self.roots.iter().map(|r| expand_home(r)));
        }
        if let Some(dir) = &self.snapshots {
            config = config.with_snapshot_dir(Some(expand_home(dir)));
        }
        if self.no_snapshots {
            config = config.with_snapshot_dir(None);
        }
        if let Some(secs) = self.timeout {
            if secs == 0 {
                bail!("--timeout must be at least 1 second");
            }
            config = config.with_scan_timeout(Duration::from_secs(secs));
        }

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }
}

/// Parse `--role` labels, rejecting anything outside the role set
pub fn parse_roles(labels: &[String]) -> Result<Vec<Role>> {
    labels
        .iter()
        .map(|label| match Role::from_label(label) {
            Role::Unknown => bail!("Unknown role '{}' (expected user, assistant, system or tool)", label),
            role => Ok(role),
        })
        .collect()
}
