//! Snapshot correlation by path similarity
//!
//! Sessions and snapshots share no identifier. The only link is the working
//! directory, so each session's project path is compared with every pane
//! directory of every snapshot and the best match above the threshold wins.

use crate::config::CorrelationConfig;
use serde::Serialize;
use session_core::{CorrelationResult, CorrelationStrength, Session, SnapshotMetadata};

/// Confidence for an exact path match
pub const EXACT_MATCH: f64 = 1.0;
/// Confidence when one path is an ancestor of the other
pub const ANCESTOR_MATCH: f64 = 0.8;

/// Strip trailing separators; `/` stays `/`
pub fn normalize_path(path: &str) -> &str {
    let trimmed = path.trim();
    let stripped = trimmed.trim_end_matches('/');
    if stripped.is_empty() && trimmed.starts_with('/') {
        "/"
    } else {
        stripped
    }
}

fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// True when `parent` is a strict segment-wise ancestor of `child`.
/// `/` is not treated as the parent of everything.
pub fn is_ancestor(parent: &str, child: &str) -> bool {
    if parent == "/" || parent.is_empty() {
        return false;
    }
    child
        .strip_prefix(parent)
        .is_some_and(|rest| rest.starts_with('/'))
}

/// Symmetric similarity of two directory paths in [0.0, 1.0]
pub fn path_similarity(a: &str, b: &str) -> f64 {
    let a = normalize_path(a);
    let b = normalize_path(b);
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return EXACT_MATCH;
    }
    if is_ancestor(a, b) || is_ancestor(b, a) {
        return ANCESTOR_MATCH;
    }

    let sa = segments(a);
    let sb = segments(b);
    let longer = sa.len().max(sb.len());
    if longer == 0 {
        return 0.0;
    }
    let common = sa.iter().zip(sb.iter()).take_while(|(x, y)| x == y).count();
    common as f64 / longer as f64
}

/// Whether two paths share their first segment
fn shares_first_segment(a: &str, b: &str) -> bool {
    match (segments(a).first(), segments(b).first()) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CorrelationSummary {
    pub sessions_examined: usize,
    pub attached: usize,
    pub strong: usize,
}

/// Attaches the best-matching snapshot to each session
#[derive(Debug, Clone)]
pub struct Correlator {
    min_confidence: f64,
    strong_confidence: f64,
}

impl Default for Correlator {
    fn default() -> Self {
        Self::new(&CorrelationConfig::default())
    }
}

impl Correlator {
    pub fn new(config: &CorrelationConfig) -> Self {
        Self {
            min_confidence: config.min_confidence,
            strong_confidence: config.strong_confidence,
        }
    }

    /// Classify a confidence; `None` below the attach threshold
    pub fn strength(&self, confidence: f64) -> Option<CorrelationStrength> {
        if confidence >= self.strong_confidence {
            Some(CorrelationStrength::Strong)
        } else if confidence >= self.min_confidence {
            Some(CorrelationStrength::Weak)
        } else {
            None
        }
    }

    /// Best snapshot for `session`. Equal confidences go to the most recent
    /// capture, then to the earlier-loaded snapshot.
    pub fn best_match(
        &self,
        session: &Session,
        snapshots: &[SnapshotMetadata],
    ) -> Option<CorrelationResult> {
        let project = session.project_path.as_deref().map(normalize_path)?;
        if project.is_empty() {
            return None;
        }

        let mut best: Option<(f64, &SnapshotMetadata, &str)> = None;
        for snapshot in snapshots {
            let dirs: Vec<&str> = if snapshot.pane_directories.is_empty() {
                vec![snapshot.working_directory.as_str()]
            } else {
                snapshot.pane_directories.iter().map(String::as_str).collect()
            };

            let candidate = dirs
                .into_iter()
                .filter(|dir| shares_first_segment(project, dir))
                .map(|dir| (path_similarity(project, dir), dir))
                .fold(None, |acc: Option<(f64, &str)>, (score, dir)| match acc {
                    Some((best_score, _)) if best_score >= score => acc,
                    _ => Some((score, dir)),
                });

            let Some((score, dir)) = candidate else {
                continue;
            };
            let replace = match best {
                None => true,
                Some((best_score, best_snapshot, _)) => {
                    score > best_score
                        || (score == best_score && snapshot.captured_at > best_snapshot.captured_at)
                }
            };
            if replace {
                best = Some((score, snapshot, dir));
            }
        }

        let (confidence, snapshot, dir) = best?;
        let strength = self.strength(confidence)?;
        Some(CorrelationResult {
            session_id: session.id.clone(),
            snapshot: snapshot.clone(),
            path_match_confidence: confidence,
            strength,
            matched_directory: dir.to_string(),
        })
    }

    /// Single enrichment pass over all sessions
    pub fn correlate(
        &self,
        sessions: &mut [Session],
        snapshots: &[SnapshotMetadata],
    ) -> CorrelationSummary {
        let mut summary = CorrelationSummary {
            sessions_examined: sessions.len(),
            ..Default::default()
        };
        if snapshots.is_empty() {
            return summary;
        }

        for session in sessions.iter_mut() {
            if let Some(result) = self.best_match(session, snapshots) {
                tracing::debug!(
                    session = %session.id,
                    snapshot = %result.snapshot.snapshot_name,
                    confidence = result.path_match_confidence,
                    "correlated session"
                );
                summary.attached += 1;
                if result.strength == CorrelationStrength::Strong {
                    summary.strong += 1;
                }
                session.correlation = Some(result);
            }
        }
        summary
    }
}
