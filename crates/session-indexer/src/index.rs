//! In-memory session index: scan, parse, correlate, search

use crate::config::IndexerConfig;
use crate::correlation::{CorrelationSummary, Correlator};
use crate::discovery::{ScanProgress, ScanReport, Scanner};
use crate::error::{IndexerError, Result};
use crate::ingest::{ingest_files, FileFailure};
use crate::search::{search_sessions, SearchMatch, SearchOptions};
use crate::snapshot::{load_snapshots, SnapshotLoad};
use crate::stats::AggregateStats;
use serde::Serialize;
use session_core::Session;
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::Instant;

/// Diagnostic summary of one index build
#[derive(Debug, Clone, Default, Serialize)]
pub struct IndexReport {
    pub scan: ScanReport,
    pub files_scanned: usize,
    pub files_parsed: usize,
    /// Files that produced no session
    pub files_skipped: usize,
    pub sessions: usize,
    pub lines_skipped: usize,
    pub duplicate_ids: usize,
    pub failures: Vec<FileFailure>,
    pub snapshots_loaded: usize,
    pub snapshot_files_skipped: usize,
    pub correlation: CorrelationSummary,
    /// The shared deadline fired during scanning, parsing or snapshot loading
    pub timed_out: bool,
}

/// Sessions built from one pass over the corpus
#[derive(Debug, Clone, Default)]
pub struct SessionIndex {
    sessions: Vec<Session>,
    report: IndexReport,
}

impl SessionIndex {
    /// Run the whole pipeline. Only invalid configuration is an error; a
    /// timeout yields a partial index with `report().timed_out` set.
    pub async fn build(config: &IndexerConfig) -> Result<Self> {
        Self::build_with_progress(config, None).await
    }

    pub async fn build_with_progress(
        config: &IndexerConfig,
        progress: Option<UnboundedSender<ScanProgress>>,
    ) -> Result<Self> {
        config.validate()?;
        let deadline = Instant::now() + config.scan_timeout();

        let mut scanner = Scanner::new(config);
        if let Some(tx) = progress {
            scanner = scanner.with_progress(tx);
        }
        let scan = scanner.scan_until(deadline).await;

        let mut report = IndexReport {
            files_scanned: scan.files.len(),
            timed_out: scan.timed_out(),
            scan: scan.report.clone(),
            ..Default::default()
        };

        let ingest = ingest_files(&scan.files, config.max_concurrent_parses, deadline).await;
        report.timed_out |= ingest.timed_out;
        report.files_parsed = ingest.files_parsed;
        report.files_skipped = ingest.failures.len();
        report.lines_skipped = ingest.lines_skipped;
        report.duplicate_ids = ingest.duplicate_ids;
        report.failures = ingest.failures;
        let mut sessions = ingest.sessions;

        if let Some(dir) = config.effective_snapshot_dir() {
            let dir = dir.to_path_buf();
            let loaded = tokio::time::timeout_at(
                deadline,
                tokio::task::spawn_blocking(move || load_snapshots(&dir)),
            )
            .await;
            let load = match loaded {
                Ok(Ok(load)) => load,
                Ok(Err(e)) => {
                    tracing::warn!(error = %e, "snapshot loading task failed");
                    SnapshotLoad::default()
                }
                Err(_) => {
                    tracing::warn!("deadline reached while loading snapshots");
                    report.timed_out = true;
                    SnapshotLoad::default()
                }
            };
            report.snapshots_loaded = load.snapshots.len();
            report.snapshot_files_skipped = load.files_skipped;
            report.correlation =
                Correlator::new(&config.correlation).correlate(&mut sessions, &load.snapshots);
        }

        report.sessions = sessions.len();
        tracing::info!(
            sessions = report.sessions,
            files = report.files_scanned,
            skipped = report.files_skipped,
            lines_skipped = report.lines_skipped,
            correlated = report.correlation.attached,
            timed_out = report.timed_out,
            "index built"
        );

        Ok(Self { sessions, report })
    }

    /// Wrap already-built sessions, e.g. from another loader
    pub fn from_sessions(sessions: Vec<Session>) -> Self {
        let report = IndexReport {
            sessions: sessions.len(),
            ..Default::default()
        };
        Self { sessions, report }
    }

    /// All-or-nothing view: a timed-out build becomes [`IndexerError::ScanTimeout`]
    pub fn require_complete(self) -> Result<Self> {
        if self.report.timed_out {
            return Err(IndexerError::ScanTimeout {
                elapsed: self.report.scan.elapsed(),
                files_found: self.report.files_scanned,
            });
        }
        Ok(self)
    }

    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    pub fn session(&self, id: &str) -> Option<&Session> {
        self.sessions.iter().find(|s| s.id == id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn search(&self, query: &str) -> Vec<SearchMatch> {
        search_sessions(&self.sessions, query, &SearchOptions::default())
    }

    pub fn search_with(&self, query: &str, options: &SearchOptions) -> Vec<SearchMatch> {
        search_sessions(&self.sessions, query, options)
    }

    pub fn aggregate_stats(&self) -> AggregateStats {
        AggregateStats::from_sessions(&self.sessions)
    }

    pub fn report(&self) -> &IndexReport {
        &self.report
    }

    pub fn into_sessions(self) -> Vec<Session> {
        self.sessions
    }
}
