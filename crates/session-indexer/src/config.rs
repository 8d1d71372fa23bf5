//! Indexer configuration
//!
//! Every tunable of the pipeline lives in [`IndexerConfig`], which is passed
//! explicitly to each stage. Values can be loaded from TOML; missing keys fall
//! back to their defaults.

use crate::error::{IndexerError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct IndexerConfig {
    /// Corpus roots to scan
    #[serde(default = "default_roots")]
    pub roots: Vec<PathBuf>,
    /// File name suffix of record files
    #[serde(default = "default_suffix")]
    pub suffix: String,
    /// Directory of multiplexer snapshot files; `None` disables correlation
    #[serde(default = "default_snapshot_dir")]
    pub snapshot_dir: Option<PathBuf>,
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    #[serde(default = "default_scan_timeout_secs")]
    pub scan_timeout_secs: u64,
    /// Report progress every N discovered files; 0 disables progress
    #[serde(default = "default_progress_interval")]
    pub progress_interval: usize,
    #[serde(default = "default_max_concurrent_parses")]
    pub max_concurrent_parses: usize,
    #[serde(default)]
    pub correlation: CorrelationConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorrelationConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,
    #[serde(default = "default_strong_confidence")]
    pub strong_confidence: f64,
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            min_confidence: default_min_confidence(),
            strong_confidence: default_strong_confidence(),
        }
    }
}

fn default_roots() -> Vec<PathBuf> {
    vec![default_projects_dir()]
}
fn default_suffix() -> String {
    ".jsonl".to_string()
}
fn default_snapshot_dir() -> Option<PathBuf> {
    Some(default_resurrect_dir())
}
fn default_max_depth() -> usize {
    20
}
fn default_scan_timeout_secs() -> u64 {
    30
}
fn default_progress_interval() -> usize {
    50
}
fn default_max_concurrent_parses() -> usize {
    4
}
fn default_enabled() -> bool {
    true
}
fn default_min_confidence() -> f64 {
    0.5
}
fn default_strong_confidence() -> f64 {
    0.8
}

fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("~"))
}

/// Default projects directory (~/.claude/projects)
pub fn default_projects_dir() -> PathBuf {
    home_dir().join(".claude").join("projects")
}

/// Default tmux-resurrect directory (~/.tmux/resurrect)
pub fn default_resurrect_dir() -> PathBuf {
    home_dir().join(".tmux").join("resurrect")
}

/// Expand a leading `~` to the home directory
pub fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => home_dir().join(rest),
        Err(_) => path.to_path_buf(),
    }
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            roots: default_roots(),
            suffix: default_suffix(),
            snapshot_dir: default_snapshot_dir(),
            max_depth: default_max_depth(),
            scan_timeout_secs: default_scan_timeout_secs(),
            progress_interval: default_progress_interval(),
            max_concurrent_parses: default_max_concurrent_parses(),
            correlation: CorrelationConfig::default(),
        }
    }
}

impl IndexerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let mut config: IndexerConfig = toml::from_str(content)?;
        config.roots = config.roots.iter().map(|r| expand_home(r)).collect();
        config.snapshot_dir = config.snapshot_dir.as_deref().map(expand_home);
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML config file
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| IndexerError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<()> {
        if self.roots.is_empty() {
            return Err(IndexerError::InvalidConfig("roots must not be empty".into()));
        }
        if self.suffix.is_empty() {
            return Err(IndexerError::InvalidConfig("suffix must not be empty".into()));
        }
        if self.scan_timeout_secs == 0 {
            return Err(IndexerError::InvalidConfig("scan_timeout_secs must be > 0".into()));
        }
        if self.max_concurrent_parses == 0 {
            return Err(IndexerError::InvalidConfig(
                "max_concurrent_parses must be > 0".into(),
            ));
        }
        let c = &self.correlation;
        for (name, value) in [
            ("correlation.min_confidence", c.min_confidence),
            ("correlation.strong_confidence", c.strong_confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(IndexerError::InvalidConfig(format!(
                    "{} must be in [0.0, 1.0]",
                    name
                )));
            }
        }
        if c.min_confidence > c.strong_confidence {
            return Err(IndexerError::InvalidConfig(
                "correlation.min_confidence must not exceed correlation.strong_confidence".into(),
            ));
        }
        Ok(())
    }

    pub fn scan_timeout(&self) -> Duration {
        Duration::from_secs(self.scan_timeout_secs)
    }

    /// Snapshot directory to correlate against, if correlation is on
    pub fn effective_snapshot_dir(&self) -> Option<&Path> {
        if !self.correlation.enabled {
            return None;
        }
        self.snapshot_dir.as_deref()
    }

    /// Replace the corpus roots
    pub fn with_roots<I, P>(mut self, roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.roots = roots.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    pub fn with_snapshot_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.snapshot_dir = dir;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_scan_timeout(mut self, timeout: Duration) -> Self {
        self.scan_timeout_secs = timeout.as_secs().max(1);
        self
    }

    pub fn with_progress_interval(mut self, interval: usize) -> Self {
        self.progress_interval = interval;
        self
    }

    pub fn with_max_concurrent_parses(mut self, permits: usize) -> Self {
        self.max_concurrent_parses = permits;
        self
    }

    pub fn with_confidence(mut self, min: f64, strong: f64) -> Self {
        self.correlation.min_confidence = min;
        self.correlation.strong_confidence = strong;
        self
    }
}
