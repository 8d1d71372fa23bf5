//! Bounded-concurrency parsing of discovered files
//!
//! Each file is parsed on the blocking pool behind a semaphore. Results are
//! merged in scanned-file order once every task has finished or the shared
//! deadline has fired. Files still in flight at the deadline are abandoned.

use serde::Serialize;
use session_core::{parse_file, session_id_from_path, ParseError, ParsedFile, Session};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileFailureKind {
    /// The file could not be opened or read
    Read,
    /// Zero bytes, or no line decoded
    Empty,
    /// Still being parsed when the deadline fired
    Abandoned,
}

/// A file that produced no session
#[derive(Debug, Clone, Serialize)]
pub struct FileFailure {
    pub path: PathBuf,
    pub kind: FileFailureKind,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct IngestOutcome {
    /// Sessions in scanned-file order
    pub sessions: Vec<Session>,
    pub failures: Vec<FileFailure>,
    pub files_parsed: usize,
    pub lines_skipped: usize,
    /// Sessions whose id collided with an earlier one and was rewritten
    pub duplicate_ids: usize,
    pub timed_out: bool,
}

type TaskOutput = (usize, Result<Result<ParsedFile, ParseError>, tokio::task::JoinError>);

/// Parse `files` with at most `max_concurrent` parses in flight
pub async fn ingest_files(files: &[PathBuf], max_concurrent: usize, deadline: Instant) -> IngestOutcome {
    let semaphore = Arc::new(Semaphore::new(max_concurrent.max(1)));
    let mut tasks: JoinSet<TaskOutput> = JoinSet::new();

    for (idx, path) in files.iter().cloned().enumerate() {
        let semaphore = Arc::clone(&semaphore);
        tasks.spawn(async move {
            let _permit = semaphore.acquire_owned().await.ok();
            let parsed = tokio::task::spawn_blocking(move || parse_file(&path)).await;
            (idx, parsed)
        });
    }

    let mut slots: Vec<Option<Result<ParsedFile, String>>> = files.iter().map(|_| None).collect();
    let collected = tokio::time::timeout_at(deadline, async {
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((idx, Ok(result))) => {
                    slots[idx] = Some(result.map_err(|e| e.to_string()));
                }
                Ok((idx, Err(e))) => {
                    slots[idx] = Some(Err(format!("parse task failed: {}", e)));
                }
                Err(e) => {
                    tracing::warn!(error = %e, "ingest task failed");
                }
            }
        }
    })
    .await;

    let timed_out = collected.is_err();
    if timed_out {
        tasks.abort_all();
        tracing::warn!(
            pending = tasks.len(),
            "ingest deadline reached, abandoning in-flight parses"
        );
    }

    let mut outcome = IngestOutcome {
        timed_out,
        ..Default::default()
    };

    for (path, slot) in files.iter().zip(slots) {
        match slot {
            Some(Ok(parsed)) => {
                outcome.files_parsed += 1;
                outcome.lines_skipped += parsed.lines_skipped;
                match parsed.session {
                    Some(session) => outcome.sessions.push(session),
                    None => {
                        let message = if parsed.line_count == 0 {
                            "empty file".to_string()
                        } else {
                            format!("no decodable records in {} lines", parsed.line_count)
                        };
                        tracing::debug!(path = %path.display(), "{}", message);
                        outcome.failures.push(FileFailure {
                            path: path.clone(),
                            kind: FileFailureKind::Empty,
                            message,
                        });
                    }
                }
            }
            Some(Err(message)) => {
                tracing::warn!(path = %path.display(), error = %message, "failed to read session file");
                outcome.failures.push(FileFailure {
                    path: path.clone(),
                    kind: FileFailureKind::Read,
                    message,
                });
            }
            None => {
                let kind = if timed_out {
                    FileFailureKind::Abandoned
                } else {
                    FileFailureKind::Read
                };
                outcome.failures.push(FileFailure {
                    path: path.clone(),
                    kind,
                    message: "no parse result".to_string(),
                });
            }
        }
    }

    outcome.duplicate_ids = dedupe_session_ids(&mut outcome.sessions);
    outcome
}

/// Make session ids unique, keeping the first occurrence. A later duplicate
/// takes its path-derived id when that is free, otherwise `<id>#<n>`.
pub fn dedupe_session_ids(sessions: &mut [Session]) -> usize {
    let mut seen: HashSet<String> = HashSet::new();
    let mut rewritten = 0;

    for session in sessions.iter_mut() {
        if seen.insert(session.id.clone()) {
            continue;
        }
        let original = session.id.clone();
        let from_path = session_id_from_path(&session.file_path);
        let replacement = if !from_path.is_empty() && !seen.contains(&from_path) {
            from_path
        } else {
            (2..)
                .map(|n| format!("{}#{}", original, n))
                .find(|candidate| !seen.contains(candidate))
                .unwrap_or_else(|| format!("{}#dup", original))
        };
        tracing::warn!(
            path = %session.file_path.display(),
            id = %original,
            new_id = %replacement,
            "duplicate session id"
        );
        seen.insert(replacement.clone());
        session.id = replacement;
        rewritten += 1;
    }
    rewritten
}
