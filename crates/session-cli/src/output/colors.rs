//! ANSI color helpers for terminal output

use colored::Colorize;
use session_core::{CorrelationStrength, Role};
use session_indexer::Provenance;

/// Get colored role indicator
pub fn colored_role(role: Role) -> String {
    match role {
        Role::User => "user".cyan().to_string(),
        Role::Assistant => "assistant".green().to_string(),
        Role::System => "system".yellow().to_string(),
        Role::Tool => "tool".blue().to_string(),
        Role::Unknown => "unknown".white().dimmed().to_string(),
    }
}

pub fn colored_provenance(provenance: Provenance) -> String {
    match provenance {
        Provenance::PrimaryContent => provenance.as_str().green().to_string(),
        Provenance::SnapshotSessionName => provenance.as_str().magenta().to_string(),
        Provenance::SnapshotCommand => provenance.as_str().blue().to_string(),
        Provenance::SnapshotDirectory => provenance.as_str().white().dimmed().to_string(),
    }
}

pub fn colored_strength(strength: CorrelationStrength) -> String {
    match strength {
        CorrelationStrength::Strong => strength.to_string().green().to_string(),
        CorrelationStrength::Weak => strength.to_string().yellow().to_string(),
    }
}

/// Get colored session name
pub fn colored_session(name: &str) -> String {
    name.cyan().bold().to_string()
}

pub fn colored_score(score: f64) -> String {
    format!("{:>7.1}", score).white().dimmed().to_string()
}

/// Get colored header
pub fn header(text: &str) -> String {
    text.bold().underline().to_string()
}

/// Get colored label
pub fn label(text: &str) -> String {
    text.white().dimmed().to_string()
}

/// Get colored value
pub fn value(text: &str) -> String {
    text.white().to_string()
}

/// Get colored success message
pub fn success(text: &str) -> String {
    format!("{} {}", "✓".green(), text)
}

/// Get colored warning message
pub fn warning(text: &str) -> String {
    format!("{} {}", "⚠".yellow(), text)
}

/// Get colored error message
pub fn error(text: &str) -> String {
    format!("{} {}", "✗".red(), text)
}

/// Format count with comma separators
pub fn format_count(n: usize) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    for (i, c) in s.chars().enumerate() {
        if i > 0 && (s.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result
}
