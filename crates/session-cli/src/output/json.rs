//! JSON output formatting

use serde_json::{json, Value};
use session_core::Session;
use session_indexer::SearchMatch;

/// Session summary without its blocks
pub fn session_to_json(session: &Session) -> Value {
    json!({
        "session_id": session.id,
        "file_path": session.file_path,
        "project_path": session.project_path,
        "slug": session.slug,
        "git_branch": session.git_branch,
        "model": session.model,
        "created_at": session.created_at,
        "modified_at": session.modified_at,
        "line_count": session.line_count,
        "lines_skipped": session.lines_skipped,
        "statistics": session.statistics,
        "correlation": session.correlation.as_ref().map(|c| json!({
            "snapshot_name": c.snapshot.snapshot_name,
            "strength": c.strength,
            "confidence": c.path_match_confidence,
            "matched_directory": c.matched_directory,
            "captured_at": c.snapshot.captured_at,
        })),
    })
}

pub fn match_to_json(hit: &SearchMatch) -> Value {
    json!({
        "session_id": hit.session_id,
        "block_sequence": hit.block_sequence,
        "role": hit.role,
        "score": hit.score,
        "provenance": hit.provenance,
        "snippet": hit.snippet,
    })
}

/// Print a value as one JSON document
pub fn print(value: &impl serde::Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use session_core::Role;
    use session_indexer::Provenance;

    #[test]
    fn test_session_json_omits_blocks() {
        let session = Session::new("abc", "/p/abc.jsonl", Utc::now());
        let value = session_to_json(&session);
        assert_eq!(value["session_id"], "abc");
        assert!(value.get("blocks").is_none());
        assert!(value["correlation"].is_null());
    }

    #[test]
    fn test_match_json_fields() {
        let hit = SearchMatch {
            session_id: "abc".into(),
            session_index: 0,
            block_sequence: Some(3),
            role: Some(Role::Assistant),
            score: 1750.0,
            snippet: "fixed the build".into(),
            provenance: Provenance::PrimaryContent,
        };
        let value = match_to_json(&hit);
        assert_eq!(value["role"], "assistant");
        assert_eq!(value["provenance"], "primary_content");
        assert_eq!(value["block_sequence"], 3);
    }
}
