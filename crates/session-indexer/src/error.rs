//! Indexer errors
//!
//! Only call-level failures are errors here. Per-entry and per-line problems
//! (permission denied, symlink cycles, malformed lines) are absorbed and
//! surfaced as counts in the scan and index reports.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IndexerError {
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Failed to read config file {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The scan deadline fired; partial results were discarded by the caller.
    #[error("Scan timed out after {elapsed:?} with {files_found} files discovered")]
    ScanTimeout {
        elapsed: Duration,
        files_found: usize,
    },
}

pub type Result<T> = std::result::Result<T, IndexerError>;
