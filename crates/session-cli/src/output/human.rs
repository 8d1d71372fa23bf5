//! Human-readable output formatting

use super::colors::*;
use colored::Colorize;
use session_core::{truncate_str, Session};
use session_indexer::search::find_case_insensitive;
use session_indexer::{AggregateStats, IndexReport, SearchMatch};

/// Format a session for list output
pub fn format_session(session: &Session) -> String {
    let mut parts = vec![
        session
            .modified_at
            .format("%Y-%m-%d %H:%M")
            .to_string()
            .white()
            .dimmed()
            .to_string(),
        colored_session(session.display_name()),
        label(&truncate_str(&session.id, 12)),
        format!("{} blocks", format_count(session.blocks.len())),
    ];

    if let Some(project) = &session.project_path {
        parts.push(value(project));
    }

    if let Some(correlation) = &session.correlation {
        parts.push(format!(
            "[tmux {} {} {:.2}]",
            colored_session(&correlation.snapshot.snapshot_name),
            colored_strength(correlation.strength),
            correlation.path_match_confidence
        ));
    }

    parts.join("  ")
}

/// Format one ranked hit; `session` is the session it points into
pub fn format_match(hit: &SearchMatch, session: Option<&Session>, query: &str) -> String {
    let name = session.map(|s| s.display_name()).unwrap_or(&hit.session_id);
    let mut head = format!(
        "{} [{}] {}",
        colored_score(hit.score),
        colored_provenance(hit.provenance),
        colored_session(name)
    );
    if let (Some(role), Some(seq)) = (hit.role, hit.block_sequence) {
        head.push_str(&format!(" {} #{}", colored_role(role), seq));
    }
    format!("{}\n    {}", head, highlight_match(&hit.snippet, query))
}

/// Highlight the first case-insensitive occurrence of `query`
pub fn highlight_match(text: &str, query: &str) -> String {
    let needle: Vec<char> = query.trim().to_lowercase().chars().collect();
    match find_case_insensitive(text, &needle) {
        Some((start, end)) => format!(
            "{}{}{}",
            &text[..start],
            text[start..end].black().on_yellow(),
            &text[end..]
        ),
        None => text.to_string(),
    }
}

/// Diagnostic summary, one line per entry
pub fn format_report(report: &IndexReport) -> Vec<String> {
    let row = |name: &str, n: usize| format!("  {:<22} {}", label(name), value(&format_count(n)));

    let mut lines = vec![
        header("Scan"),
        row("directories visited", report.scan.directories_visited),
        row("files scanned", report.files_scanned),
        row("files parsed", report.files_parsed),
        row("files skipped", report.files_skipped),
        row("lines skipped", report.lines_skipped),
        row("sessions", report.sessions),
        row("duplicate ids", report.duplicate_ids),
        row("entries skipped", report.scan.entries_skipped),
        row("symlink cycles", report.scan.cycles_detected),
        row("depth exceeded", report.scan.depth_exceeded),
        format!("  {:<22} {} ms", label("elapsed"), value(&report.scan.elapsed_ms.to_string())),
        String::new(),
        header("Correlation"),
        row("snapshots loaded", report.snapshots_loaded),
        row("snapshot files skipped", report.snapshot_files_skipped),
        row("sessions attached", report.correlation.attached),
        row("strong matches", report.correlation.strong),
    ];

    if !report.failures.is_empty() {
        lines.push(String::new());
        lines.push(header("Skipped files"));
        for failure in &report.failures {
            lines.push(format!(
                "  {} {}",
                error(&failure.path.display().to_string()),
                label(&format!("({:?}: {})", failure.kind, failure.message))
            ));
        }
    }

    lines.push(String::new());
    lines.push(if report.timed_out {
        warning("timed out, results are partial")
    } else {
        success("complete")
    });
    lines
}

/// Corpus totals and frequency tables
pub fn format_stats(stats: &AggregateStats) -> Vec<String> {
    let row = |name: &str, n: usize| format!("  {:<22} {}", label(name), value(&format_count(n)));

    let mut lines = vec![
        header("Corpus"),
        row("sessions", stats.total_sessions),
        row("blocks", stats.total_blocks),
        row("words", stats.total_words),
        row("correlated", stats.correlated_sessions),
    ];
    if let Some(secs) = stats.average_session_duration_secs {
        lines.push(format!(
            "  {:<22} {}",
            label("average duration"),
            value(&format!("{}m {}s", secs / 60, secs % 60))
        ));
    }

    let mut languages: Vec<_> = stats.languages.iter().collect();
    languages.sort_by(|a, b| b.1.cmp(a.1));
    let tables = [
        ("languages", ranked(languages)),
        ("topics", ranked(stats.common_topics.iter().map(|(n, c)| (n, c)))),
        ("tools", ranked(stats.tools.iter().map(|(n, c)| (n, c)))),
    ];
    for (name, text) in tables {
        if !text.is_empty() {
            lines.push(format!("  {:<22} {}", label(name), text));
        }
    }
    lines
}

fn ranked<'a>(entries: impl IntoIterator<Item = (&'a String, &'a usize)>) -> String {
    entries
        .into_iter()
        .map(|(name, n)| format!("{} ({})", name, n))
        .collect::<Vec<_>>()
        .join(", ")
}
