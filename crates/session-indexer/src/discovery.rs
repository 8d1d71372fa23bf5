//! Async discovery of session record files
//!
//! The scanner walks its roots breadth-first. Each directory is listed, with
//! the metadata of every entry, inside one `spawn_blocking` call, and the walk
//! yields back to the runtime after every directory. A single deadline bounds
//! the whole scan; when it fires the files found so far are returned with the
//! `timed_out` flag set.

use crate::config::IndexerConfig;
use crate::error::{IndexerError, Result};
use serde::Serialize;
use std::collections::{HashSet, VecDeque};
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::Instant;

/// Stable identity of a directory, used to detect symlink cycles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileIdentity {
    dev: u64,
    ino: u64,
}

impl FileIdentity {
    /// Identity of the file behind `metadata`, or `None` where the platform
    /// has no stable file identity.
    #[cfg(unix)]
    pub fn of(metadata: &Metadata) -> Option<Self> {
        use std::os::unix::fs::MetadataExt;
        Some(Self {
            dev: metadata.dev(),
            ino: metadata.ino(),
        })
    }

    #[cfg(not(unix))]
    pub fn of(_metadata: &Metadata) -> Option<Self> {
        None
    }

    pub fn supported() -> bool {
        cfg!(unix)
    }
}

/// Progress snapshot sent every `progress_interval` discovered files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanProgress {
    pub files_found: usize,
    pub directories_visited: usize,
    pub current_dir: PathBuf,
}

/// Diagnostics for one scan
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    pub directories_visited: usize,
    pub files_discovered: usize,
    /// Entries or directories that could not be read
    pub entries_skipped: usize,
    pub cycles_detected: usize,
    /// Branches abandoned at the depth limit
    pub depth_exceeded: usize,
    pub elapsed_ms: u64,
    pub timed_out: bool,
}

impl ScanReport {
    pub fn elapsed(&self) -> Duration {
        Duration::from_millis(self.elapsed_ms)
    }
}

/// Files found by a scan, sorted and de-duplicated, plus its diagnostics
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub files: Vec<PathBuf>,
    pub report: ScanReport,
}

impl ScanOutcome {
    pub fn timed_out(&self) -> bool {
        self.report.timed_out
    }

    /// All-or-nothing view: a timed-out scan becomes [`IndexerError::ScanTimeout`]
    pub fn into_result(self) -> Result<Vec<PathBuf>> {
        if self.report.timed_out {
            return Err(IndexerError::ScanTimeout {
                elapsed: self.report.elapsed(),
                files_found: self.files.len(),
            });
        }
        Ok(self.files)
    }
}

/// One entry of a directory listing, as seen from the blocking pool
#[derive(Debug)]
enum ListedEntry {
    Dir {
        path: PathBuf,
        identity: Option<FileIdentity>,
    },
    File {
        path: PathBuf,
    },
    Skipped {
        path: PathBuf,
        error: std::io::Error,
    },
}

/// Read a directory and stat every entry, following symlinks
fn read_listing(dir: &Path) -> std::io::Result<Vec<ListedEntry>> {
    let mut entries = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(error) => {
                entries.push(ListedEntry::Skipped {
                    path: dir.to_path_buf(),
                    error,
                });
                continue;
            }
        };
        let path = entry.path();
        match std::fs::metadata(&path) {
            Ok(meta) if meta.is_dir() => entries.push(ListedEntry::Dir {
                identity: FileIdentity::of(&meta),
                path,
            }),
            Ok(meta) if meta.is_file() => entries.push(ListedEntry::File { path }),
            Ok(_) => {}
            Err(error) => entries.push(ListedEntry::Skipped { path, error }),
        }
    }
    Ok(entries)
}

/// State owned by one scan
#[derive(Default)]
struct ScanState {
    files: Vec<PathBuf>,
    visited: HashSet<FileIdentity>,
    report: ScanReport,
}

/// Breadth-first, cycle-aware file scanner
#[derive(Debug, Clone)]
pub struct Scanner {
    roots: Vec<PathBuf>,
    suffix: String,
    max_depth: usize,
    timeout: Duration,
    progress_interval: usize,
    progress: Option<UnboundedSender<ScanProgress>>,
}

impl Scanner {
    pub fn new(config: &IndexerConfig) -> Self {
        Self {
            roots: config.roots.clone(),
            suffix: config.suffix.clone(),
            max_depth: config.max_depth,
            timeout: config.scan_timeout(),
            progress_interval: config.progress_interval,
            progress: None,
        }
    }

    pub fn with_progress(mut self, sender: UnboundedSender<ScanProgress>) -> Self {
        self.progress = Some(sender);
        self
    }

    /// Scan with the configured timeout
    pub async fn scan(&self) -> ScanOutcome {
        self.scan_until(Instant::now() + self.timeout).await
    }

    /// Scan until `deadline`. The blocking call in flight when the deadline
    /// fires is abandoned and its listing discarded.
    pub async fn scan_until(&self, deadline: Instant) -> ScanOutcome {
        let started = Instant::now();
        let mut state = ScanState::default();

        if !FileIdentity::supported() {
            tracing::warn!("file identity unavailable on this platform; symlink cycles are bounded by max_depth only");
        }

        let finished = tokio::time::timeout_at(deadline, self.walk(&mut state)).await;
        let timed_out = finished.is_err();

        let mut files = state.files;
        files.sort();
        files.dedup();

        let mut report = state.report;
        report.files_discovered = files.len();
        report.elapsed_ms = started.elapsed().as_millis() as u64;
        report.timed_out = timed_out;

        if timed_out {
            tracing::warn!(
                files = files.len(),
                elapsed_ms = report.elapsed_ms,
                "scan timed out, returning partial results"
            );
        } else {
            tracing::debug!(
                files = files.len(),
                directories = report.directories_visited,
                elapsed_ms = report.elapsed_ms,
                "scan complete"
            );
        }

        ScanOutcome { files, report }
    }

    fn matches_suffix(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| name.ends_with(&self.suffix))
    }

    fn push_file(&self, state: &mut ScanState, path: PathBuf, current_dir: &Path) {
        state.files.push(path);
        let found = state.files.len();
        if self.progress_interval > 0 && found % self.progress_interval == 0 {
            if let Some(tx) = &self.progress {
                // receiver may have been dropped
                let _ = tx.send(ScanProgress {
                    files_found: found,
                    directories_visited: state.report.directories_visited,
                    current_dir: current_dir.to_path_buf(),
                });
            }
        }
    }

    async fn walk(&self, state: &mut ScanState) {
        let mut queue: VecDeque<(PathBuf, usize)> = VecDeque::new();

        for root in &self.roots {
            let target = root.clone();
            let metadata = tokio::task::spawn_blocking(move || std::fs::metadata(target)).await;
            match metadata {
                Ok(Ok(meta)) if meta.is_dir() => {
                    if let Some(identity) = FileIdentity::of(&meta) {
                        if !state.visited.insert(identity) {
                            tracing::debug!(root = %root.display(), "root already scanned");
                            continue;
                        }
                    }
                    queue.push_back((root.clone(), 0));
                }
                Ok(Ok(meta)) => {
                    if meta.is_file() && self.matches_suffix(root) {
                        let parent = root.parent().unwrap_or(root).to_path_buf();
                        self.push_file(state, root.clone(), &parent);
                    }
                }
                Ok(Err(e)) => {
                    state.report.entries_skipped += 1;
                    tracing::warn!(root = %root.display(), error = %e, "skipping unreadable root");
                }
                Err(e) => {
                    state.report.entries_skipped += 1;
                    tracing::warn!(root = %root.display(), error = %e, "root metadata task failed");
                }
            }
        }

        while let Some((dir, depth)) = queue.pop_front() {
            let target = dir.clone();
            let listing = tokio::task::spawn_blocking(move || read_listing(&target)).await;
            let entries = match listing {
                Ok(Ok(entries)) => entries,
                Ok(Err(e)) => {
                    state.report.entries_skipped += 1;
                    tracing::warn!(path = %dir.display(), error = %e, "skipping unreadable directory");
                    continue;
                }
                Err(e) => {
                    state.report.entries_skipped += 1;
                    tracing::warn!(path = %dir.display(), error = %e, "directory listing task failed");
                    continue;
                }
            };
            state.report.directories_visited += 1;

            for entry in entries {
                match entry {
                    ListedEntry::File { path } => {
                        if self.matches_suffix(&path) {
                            self.push_file(state, path, &dir);
                        }
                    }
                    ListedEntry::Dir { path, identity } => {
                        // Entries of a directory at depth d sit at depth d + 1
                        let child_depth = depth + 1;
                        if child_depth >= self.max_depth {
                            state.report.depth_exceeded += 1;
                            tracing::warn!(
                                path = %path.display(),
                                max_depth = self.max_depth,
                                "max depth exceeded, abandoning branch"
                            );
                            continue;
                        }
                        if let Some(identity) = identity {
                            if !state.visited.insert(identity) {
                                state.report.cycles_detected += 1;
                                tracing::warn!(path = %path.display(), "symlink cycle detected, skipping");
                                continue;
                            }
                        }
                        queue.push_back((path, child_depth));
                    }
                    ListedEntry::Skipped { path, error } => {
                        state.report.entries_skipped += 1;
                        tracing::warn!(path = %path.display(), error = %error, "skipping unreadable entry");
                    }
                }
            }

            tokio::task::yield_now().await;
        }
    }
}

/// Scan with the given config and no progress channel
pub async fn scan_roots(config: &IndexerConfig) -> ScanOutcome {
    Scanner::new(config).scan().await
}
