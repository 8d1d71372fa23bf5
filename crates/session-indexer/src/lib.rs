//! session-indexer - Scanning, correlation and ranked search over session transcripts
//!
//! The pipeline behind [`SessionIndex::build`]:
//!
//! 1. [`discovery`] walks the corpus roots without blocking the runtime.
//! 2. [`ingest`] parses the discovered files with bounded concurrency.
//! 3. [`snapshot`] loads multiplexer snapshots and [`correlation`] attaches
//!    the best match to each session.
//! 4. [`search`] ranks content and metadata hits for a query and
//!    [`stats`] summarises the corpus.
//!
//! Everything is in memory and rebuilt on each invocation.

pub mod config;
pub mod correlation;
pub mod discovery;
pub mod error;
pub mod index;
pub mod ingest;
pub mod search;
pub mod snapshot;
pub mod stats;

pub use config::{CorrelationConfig, IndexerConfig};
pub use correlation::{path_similarity, CorrelationSummary, Correlator};
pub use discovery::{scan_roots, FileIdentity, ScanOutcome, ScanProgress, ScanReport, Scanner};
pub use error::{IndexerError, Result};
pub use index::{IndexReport, SessionIndex};
pub use ingest::{ingest_files, FileFailure, FileFailureKind};
pub use search::{Provenance, SearchMatch, SearchOptions, WeightBand};
pub use snapshot::{load_snapshots, SnapshotLoad};
pub use stats::AggregateStats;
