//! Core type definitions for session data

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Role of the speaker behind a block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    System,
    Tool,
    Unknown,
}

impl Role {
    /// Map a free-form role label onto the closed role set
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "user" | "human" => Role::User,
            "assistant" => Role::Assistant,
            "system" => Role::System,
            "tool" | "tool_use" | "tool_result" => Role::Tool,
            _ => Role::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
            Role::Tool => "tool",
            Role::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category assigned to a whitespace-delimited run of prose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    Word,
    Number,
    Punctuation,
    Code,
    FilePath,
    Url,
}

/// A classified token with its byte span in the block's raw text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentToken {
    pub text: String,
    pub token_type: TokenType,
    pub position: usize,
    pub length: usize,
}

/// Language tag of a code fragment
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgrammingLanguage {
    Rust,
    Python,
    JavaScript,
    TypeScript,
    Go,
    Java,
    C,
    Cpp,
    CSharp,
    Ruby,
    Swift,
    Kotlin,
    Shell,
    Sql,
    Json,
    Yaml,
    Toml,
    Html,
    Css,
    Markdown,
    Other(String),
}

impl ProgrammingLanguage {
    /// Resolve a fence info string such as `rust`, `ts` or `bash`
    pub fn from_tag(tag: &str) -> Self {
        let tag = tag.trim().to_ascii_lowercase();
        match tag.as_str() {
            "rust" | "rs" => ProgrammingLanguage::Rust,
            "python" | "py" | "python3" => ProgrammingLanguage::Python,
            "javascript" | "js" | "jsx" | "mjs" => ProgrammingLanguage::JavaScript,
            "typescript" | "ts" | "tsx" => ProgrammingLanguage::TypeScript,
            "go" | "golang" => ProgrammingLanguage::Go,
            "java" => ProgrammingLanguage::Java,
            "c" | "h" => ProgrammingLanguage::C,
            "cpp" | "c++" | "cc" | "hpp" | "cxx" => ProgrammingLanguage::Cpp,
            "csharp" | "cs" | "c#" => ProgrammingLanguage::CSharp,
            "ruby" | "rb" => ProgrammingLanguage::Ruby,
            "swift" => ProgrammingLanguage::Swift,
            "kotlin" | "kt" => ProgrammingLanguage::Kotlin,
            "bash" | "sh" | "shell" | "zsh" | "fish" | "console" | "shell-session" => {
                ProgrammingLanguage::Shell
            }
            "sql" => ProgrammingLanguage::Sql,
            "json" | "jsonl" => ProgrammingLanguage::Json,
            "yaml" | "yml" => ProgrammingLanguage::Yaml,
            "toml" => ProgrammingLanguage::Toml,
            "html" | "xml" => ProgrammingLanguage::Html,
            "css" | "scss" => ProgrammingLanguage::Css,
            "markdown" | "md" => ProgrammingLanguage::Markdown,
            _ => ProgrammingLanguage::Other(tag),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ProgrammingLanguage::Rust => "rust",
            ProgrammingLanguage::Python => "python",
            ProgrammingLanguage::JavaScript => "javascript",
            ProgrammingLanguage::TypeScript => "typescript",
            ProgrammingLanguage::Go => "go",
            ProgrammingLanguage::Java => "java",
            ProgrammingLanguage::C => "c",
            ProgrammingLanguage::Cpp => "cpp",
            ProgrammingLanguage::CSharp => "csharp",
            ProgrammingLanguage::Ruby => "ruby",
            ProgrammingLanguage::Swift => "swift",
            ProgrammingLanguage::Kotlin => "kotlin",
            ProgrammingLanguage::Shell => "shell",
            ProgrammingLanguage::Sql => "sql",
            ProgrammingLanguage::Json => "json",
            ProgrammingLanguage::Yaml => "yaml",
            ProgrammingLanguage::Toml => "toml",
            ProgrammingLanguage::Html => "html",
            ProgrammingLanguage::Css => "css",
            ProgrammingLanguage::Markdown => "markdown",
            ProgrammingLanguage::Other(tag) => tag,
        }
    }
}

/// A fenced or inline code region found in a block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeFragment {
    pub language: Option<ProgrammingLanguage>,
    pub content: String,
    pub inline: bool,
    /// Byte range of the fragment, delimiters included
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkType {
    External,
    Documentation,
    Repository,
    File,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub url: String,
    pub title: Option<String>,
    pub link_type: LinkType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MentionType {
    File,
    Command,
}

/// A symbolic reference to a file or a shell command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mention {
    pub text: String,
    pub mention_type: MentionType,
}

/// Searchable structure derived from a block's raw text
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockContent {
    pub raw_text: String,
    pub tokens: Vec<ContentToken>,
    pub code_fragments: Vec<CodeFragment>,
    pub links: Vec<Link>,
    pub mentions: Vec<Mention>,
    /// Prose words, fenced and inline code excluded
    pub word_count: usize,
    /// Prose characters, fenced code excluded
    pub character_count: usize,
}

impl BlockContent {
    pub fn mentions_of(&self, kind: MentionType) -> impl Iterator<Item = &Mention> {
        self.mentions.iter().filter(move |m| m.mention_type == kind)
    }
}

/// One turn within a session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    /// 1-based physical line number of the record in its file
    pub sequence: u64,
    pub role: Role,
    pub timestamp: Option<DateTime<Utc>>,
    pub uuid: Option<String>,
    pub parent_uuid: Option<String>,
    pub content: BlockContent,
    /// Tool names invoked in this record
    pub tools: Vec<String>,
    pub topics: Vec<String>,
    /// Unrecognised record fields, kept as-is
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Block {
    pub fn raw_text(&self) -> &str {
        &self.content.raw_text
    }

    /// Get a one-line preview of the block text
    pub fn preview(&self, max_len: usize) -> String {
        let first_line = self.raw_text().lines().next().unwrap_or("");
        truncate_str(first_line, max_len)
    }
}

/// Aggregate counts over a session's blocks
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStatistics {
    pub total_blocks: usize,
    pub user_blocks: usize,
    pub assistant_blocks: usize,
    pub system_blocks: usize,
    pub tool_blocks: usize,
    pub unknown_blocks: usize,
    pub total_words: usize,
    pub total_characters: usize,
    pub code_fragments: usize,
    pub links: usize,
    pub files_referenced: usize,
    pub commands_referenced: usize,
}

impl SessionStatistics {
    pub fn from_blocks(blocks: &[Block]) -> Self {
        let mut stats = SessionStatistics {
            total_blocks: blocks.len(),
            ..Default::default()
        };
        for block in blocks {
            match block.role {
                Role::User => stats.user_blocks += 1,
                Role::Assistant => stats.assistant_blocks += 1,
                Role::System => stats.system_blocks += 1,
                Role::Tool => stats.tool_blocks += 1,
                Role::Unknown => stats.unknown_blocks += 1,
            }
            let content = &block.content;
            stats.total_words += content.word_count;
            stats.total_characters += content.character_count;
            stats.code_fragments += content.code_fragments.len();
            stats.links += content.links.len();
            stats.files_referenced += content.mentions_of(MentionType::File).count();
            stats.commands_referenced += content.mentions_of(MentionType::Command).count();
        }
        stats
    }
}

/// One terminal-multiplexer session captured in a backup snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    pub snapshot_name: String,
    pub source_file: PathBuf,
    pub window_count: usize,
    pub pane_count: usize,
    pub working_directory: String,
    /// Every pane directory of this multiplexer session, in file order
    pub pane_directories: Vec<String>,
    pub shell_command: Option<String>,
    pub captured_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationStrength {
    Weak,
    Strong,
}

impl fmt::Display for CorrelationStrength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CorrelationStrength::Weak => f.write_str("weak"),
            CorrelationStrength::Strong => f.write_str("strong"),
        }
    }
}

/// Best snapshot match attached to a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationResult {
    pub session_id: String,
    pub snapshot: SnapshotMetadata,
    pub path_match_confidence: f64,
    pub strength: CorrelationStrength,
    /// The snapshot pane directory that produced the score
    pub matched_directory: String,
}

/// One reconstructed conversation, built from one file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub file_path: PathBuf,
    pub project_path: Option<String>,
    pub slug: Option<String>,
    pub git_branch: Option<String>,
    pub model: Option<String>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub file_size_bytes: u64,
    pub line_count: usize,
    pub lines_skipped: usize,
    pub blocks: Vec<Block>,
    pub statistics: SessionStatistics,
    pub correlation: Option<CorrelationResult>,
}

impl Session {
    pub fn new(id: impl Into<String>, file_path: impl Into<PathBuf>, now: DateTime<Utc>) -> Self {
        Session {
            id: id.into(),
            file_path: file_path.into(),
            project_path: None,
            slug: None,
            git_branch: None,
            model: None,
            created_at: now,
            modified_at: now,
            file_size_bytes: 0,
            line_count: 0,
            lines_skipped: 0,
            blocks: Vec::new(),
            statistics: SessionStatistics::default(),
            correlation: None,
        }
    }

    /// Append a block, rejecting it unless its sequence number is strictly
    /// greater than the last one.
    pub fn push_block(&mut self, block: Block) -> bool {
        if let Some(last) = self.blocks.last() {
            if block.sequence <= last.sequence {
                return false;
            }
        }
        self.blocks.push(block);
        true
    }

    pub fn refresh_statistics(&mut self) {
        self.statistics = SessionStatistics::from_blocks(&self.blocks);
    }

    pub fn blocks_by_role(&self, role: Role) -> impl Iterator<Item = &Block> {
        self.blocks.iter().filter(move |b| b.role == role)
    }

    /// Time between the first and last timestamped blocks
    pub fn duration(&self) -> Option<Duration> {
        let mut stamps = self.blocks.iter().filter_map(|b| b.timestamp);
        let first = stamps.next()?;
        let last = stamps.last().unwrap_or(first);
        Some(last - first)
    }

    pub fn has_correlated_metadata(&self) -> bool {
        self.correlation.is_some()
    }

    pub fn snapshot(&self) -> Option<&SnapshotMetadata> {
        self.correlation.as_ref().map(|c| &c.snapshot)
    }

    /// Short label for listings: the last segment of the project path, or the id
    pub fn display_name(&self) -> &str {
        self.project_path
            .as_deref()
            .and_then(|p| p.trim_end_matches('/').rsplit('/').next())
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.id)
    }
}

/// Truncate a string to a maximum length, respecting UTF-8 boundaries
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let target = max_len.saturating_sub(3);
    let mut end = target.min(s.len());
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn block(sequence: u64, role: Role, text: &str) -> Block {
        Block {
            sequence,
            role,
            timestamp: None,
            uuid: None,
            parent_uuid: None,
            content: BlockContent {
                raw_text: text.to_string(),
                word_count: text.split_whitespace().count(),
                character_count: text.chars().count(),
                ..Default::default()
            },
            tools: Vec::new(),
            topics: Vec::new(),
            extra: serde_json::Map::new(),
        }
    }

    #[test]
    fn test_role_from_label() {
        assert_eq!(Role::from_label("user"), Role::User);
        assert_eq!(Role::from_label(" Assistant "), Role::Assistant);
        assert_eq!(Role::from_label("system"), Role::System);
        assert_eq!(Role::from_label("tool"), Role::Tool);
        assert_eq!(Role::from_label("file-history-snapshot"), Role::Unknown);
        assert_eq!(Role::from_label(""), Role::Unknown);
    }

    #[test]
    fn test_language_from_tag() {
        assert_eq!(ProgrammingLanguage::from_tag("rs"), ProgrammingLanguage::Rust);
        assert_eq!(ProgrammingLanguage::from_tag("BASH"), ProgrammingLanguage::Shell);
        assert_eq!(
            ProgrammingLanguage::from_tag("zig"),
            ProgrammingLanguage::Other("zig".to_string())
        );
        assert_eq!(ProgrammingLanguage::from_tag("zig").name(), "zig");
    }

    #[test]
    fn test_push_block_requires_increasing_sequence() {
        let now = Utc::now();
        let mut session = Session::new("s1", "/tmp/s1.jsonl", now);
        assert!(session.push_block(block(1, Role::User, "hi")));
        assert!(session.push_block(block(4, Role::Assistant, "hello")));
        assert!(!session.push_block(block(4, Role::User, "dup")));
        assert!(!session.push_block(block(2, Role::User, "back")));
        assert_eq!(session.blocks.len(), 2);
    }

    #[test]
    fn test_statistics_and_duration() {
        let mut session = Session::new("s1", "/tmp/s1.jsonl", Utc::now());
        let mut first = block(1, Role::User, "fix the build");
        first.timestamp = Some(Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap());
        let mut second = block(2, Role::Assistant, "done");
        second.timestamp = Some(Utc.with_ymd_and_hms(2024, 1, 1, 10, 5, 0).unwrap());
        session.push_block(first);
        session.push_block(second);
        session.push_block(block(3, Role::Tool, "ok"));
        session.refresh_statistics();

        assert_eq!(session.statistics.total_blocks, 3);
        assert_eq!(session.statistics.user_blocks, 1);
        assert_eq!(session.statistics.tool_blocks, 1);
        assert_eq!(session.statistics.total_words, 5);
        assert_eq!(session.duration(), Some(Duration::minutes(5)));
        assert!(!session.has_correlated_metadata());
        assert_eq!(session.blocks_by_role(Role::Assistant).count(), 1);
    }

    #[test]
    fn test_display_name() {
        let mut session = Session::new("abc", "/tmp/abc.jsonl", Utc::now());
        assert_eq!(session.display_name(), "abc");
        session.project_path = Some("/home/me/work/app/".to_string());
        assert_eq!(session.display_name(), "app");
    }

    #[test]
    fn test_truncate_str_respects_char_boundaries() {
        assert_eq!(truncate_str("short", 10), "short");
        assert_eq!(truncate_str("hello world", 8), "hello...");
        let s = "héllo wörld";
        let out = truncate_str(s, 5);
        assert!(out.ends_with("..."));
    }
}
