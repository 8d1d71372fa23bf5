//! Markdown export

use session_core::Session;
use std::collections::HashMap;

/// Topics listed per session
const SESSION_TOPICS: usize = 5;

/// One section per session, separated by rules
pub fn sessions_to_markdown(sessions: &[&Session]) -> String {
    let mut out = String::from("# Claude Sessions\n\n");
    for session in sessions {
        write_session(&mut out, session);
    }
    out
}

fn write_session(out: &mut String, session: &Session) {
    out.push_str(&format!("## {}\n\n", session.display_name()));
    out.push_str(&format!("- **Id:** {}\n", session.id));
    out.push_str(&format!("- **File:** {}\n", session.file_path.display()));
    if let Some(project) = &session.project_path {
        out.push_str(&format!("- **Project:** {}\n", project));
    }
    out.push_str(&format!(
        "- **Created:** {}\n",
        session.created_at.format("%Y-%m-%d %H:%M:%S")
    ));
    out.push_str(&format!("- **Blocks:** {}\n", session.statistics.total_blocks));
    out.push_str(&format!("- **Words:** {}\n", session.statistics.total_words));
    if let Some(duration) = session.duration() {
        out.push_str(&format!("- **Duration:** {} minutes\n", duration.num_minutes()));
    }
    if let Some(c) = &session.correlation {
        out.push_str(&format!(
            "- **tmux:** {} ({}, {:.2})\n",
            c.snapshot.snapshot_name, c.strength, c.path_match_confidence
        ));
    }

    let topics = session_topics(session);
    if !topics.is_empty() {
        out.push_str("\n### Topics\n\n");
        for (topic, n) in topics {
            out.push_str(&format!("- **{}** ({} blocks)\n", topic, n));
        }
    }
    out.push_str("\n---\n\n");
}

fn session_topics(session: &Session) -> Vec<(&str, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for topic in session.blocks.iter().flat_map(|b| &b.topics) {
        *counts.entry(topic.as_str()).or_insert(0) += 1;
    }
    let mut topics: Vec<_> = counts.into_iter().collect();
    topics.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    topics.truncate(SESSION_TOPICS);
    topics
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use session_core::{extract_content, Block, Role};

    #[test]
    fn test_markdown_sections() {
        let mut session = Session::new("abc", "/p/abc.jsonl", Utc::now());
        session.project_path = Some("/home/a/webapp".to_string());
        for (seq, topics) in [(1, vec!["rust", "edit"]), (2, vec!["rust"])] {
            session.push_block(Block {
                sequence: seq,
                role: Role::Assistant,
                timestamp: None,
                uuid: None,
                parent_uuid: None,
                content: extract_content("done"),
                tools: Vec::new(),
                topics: topics.into_iter().map(String::from).collect(),
                extra: Default::default(),
            });
        }
        session.refresh_statistics();

        let md = sessions_to_markdown(&[&session]);
        assert!(md.starts_with("# Claude Sessions"));
        assert!(md.contains("## webapp"));
        assert!(md.contains("- **Blocks:** 2"));
        assert!(md.contains("- **rust** (2 blocks)\n- **edit** (1 blocks)"));
        assert!(!md.contains("Duration"));
        assert!(md.trim_end().ends_with("---"));
    }
}
