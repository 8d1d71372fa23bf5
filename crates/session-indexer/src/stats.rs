//! Corpus-wide aggregate statistics

use serde::Serialize;
use session_core::Session;
use std::collections::{BTreeMap, HashMap};

/// How many topics and tools the aggregate keeps
pub const TOP_N: usize = 10;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregateStats {
    pub total_sessions: usize,
    pub total_blocks: usize,
    pub total_words: usize,
    pub correlated_sessions: usize,
    /// Tagged code fragments per language name
    pub languages: BTreeMap<String, usize>,
    /// Most frequent block topics, highest count first
    pub common_topics: Vec<(String, usize)>,
    /// Most frequent tool invocations, highest count first
    pub tools: Vec<(String, usize)>,
    /// Mean over sessions with at least one timestamped block
    pub average_session_duration_secs: Option<i64>,
}

impl AggregateStats {
    pub fn from_sessions(sessions: &[Session]) -> Self {
        let mut stats = AggregateStats {
            total_sessions: sessions.len(),
            ..Default::default()
        };
        let mut topics: HashMap<&str, usize> = HashMap::new();
        let mut tools: HashMap<&str, usize> = HashMap::new();
        let mut durations = Vec::new();

        for session in sessions {
            stats.total_blocks += session.blocks.len();
            stats.total_words += session.statistics.total_words;
            if session.has_correlated_metadata() {
                stats.correlated_sessions += 1;
            }
            if let Some(duration) = session.duration() {
                durations.push(duration.num_seconds());
            }
            for block in &session.blocks {
                for language in block
                    .content
                    .code_fragments
                    .iter()
                    .filter_map(|f| f.language.as_ref())
                {
                    *stats.languages.entry(language.name().to_string()).or_insert(0) += 1;
                }
                for topic in &block.topics {
                    *topics.entry(topic.as_str()).or_insert(0) += 1;
                }
                for tool in &block.tools {
                    *tools.entry(tool.as_str()).or_insert(0) += 1;
                }
            }
        }

        stats.common_topics = top_counts(topics);
        stats.tools = top_counts(tools);
        if !durations.is_empty() {
            stats.average_session_duration_secs =
                Some(durations.iter().sum::<i64>() / durations.len() as i64);
        }
        stats
    }
}

/// Descending by count, ties broken by name
fn top_counts(counts: HashMap<&str, usize>) -> Vec<(String, usize)> {
    let mut entries: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(name, n)| (name.to_string(), n))
        .collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    entries.truncate(TOP_N);
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use session_core::{extract_content, Block, Role};

    fn block(sequence: u64, text: &str, tools: &[&str], topics: &[&str]) -> Block {
        Block {
            sequence,
            role: Role::Assistant,
            timestamp: None,
            uuid: None,
            parent_uuid: None,
            content: extract_content(text),
            tools: tools.iter().map(|t| t.to_string()).collect(),
            topics: topics.iter().map(|t| t.to_string()).collect(),
            extra: Default::default(),
        }
    }

    #[test]
    fn test_empty_corpus() {
        let stats = AggregateStats::from_sessions(&[]);
        assert_eq!(stats, AggregateStats::default());
        assert!(stats.average_session_duration_secs.is_none());
    }

    #[test]
    fn test_counts_languages_topics_and_tools() {
        let now = Utc::now();
        let mut first = block(1, "```rust\nfn a() {}\n```\n", &["Edit"], &["rust", "edit"]);
        first.timestamp = Some(now);
        let mut second = block(2, "```rust\nfn b() {}\n```\n", &["Edit", "Bash"], &["rust"]);
        second.timestamp = Some(now + Duration::seconds(90));

        let mut a = Session::new("a", "/p/a.jsonl", now);
        a.push_block(first);
        a.push_block(second);
        a.refresh_statistics();

        let mut b = Session::new("b", "/p/b.jsonl", now);
        b.push_block(block(1, "```py\nprint(1)\n```\n", &[], &["python"]));
        b.refresh_statistics();

        let stats = AggregateStats::from_sessions(&[a, b]);
        assert_eq!(stats.total_sessions, 2);
        assert_eq!(stats.total_blocks, 3);
        assert_eq!(stats.correlated_sessions, 0);
        assert_eq!(stats.languages.get("rust"), Some(&2));
        assert_eq!(stats.languages.get("python"), Some(&1));
        assert_eq!(stats.common_topics[0], ("rust".to_string(), 2));
        assert_eq!(
            stats.tools,
            vec![("Edit".to_string(), 2), ("Bash".to_string(), 1)]
        );
        assert_eq!(stats.average_session_duration_secs, Some(90));
    }

    #[test]
    fn test_top_counts_truncates_and_breaks_ties_by_name() {
        let mut counts = HashMap::new();
        let names: Vec<String> = (0..15).map(|i| format!("t{i:02}")).collect();
        for name in &names {
            counts.insert(name.as_str(), 1);
        }
        let top = top_counts(counts);
        assert_eq!(top.len(), TOP_N);
        assert_eq!(top[0].0, "t00");
    }
}
