//! Ranked search over sessions and their correlated snapshot metadata
//!
//! Each hit carries a [`Provenance`]. Provenances own disjoint weight bands,
//! so any hit in conversation content outranks any hit that exists only in
//! correlated metadata.

use serde::Serialize;
use chrono::{DateTime, Utc};
use session_core::{Block, ProgrammingLanguage, Role, Session, SnapshotMetadata};
use std::cmp::Ordering;
use std::fmt;

/// Chars of context kept before a match in a snippet
pub const SNIPPET_BEFORE: usize = 100;
/// Chars of context kept after the start of a match in a snippet
pub const SNIPPET_AFTER: usize = 200;

/// Inclusive score range
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WeightBand {
    pub min: f64,
    pub max: f64,
}

impl WeightBand {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Position `fraction` (clamped to [0, 1]) within the band
    pub fn scale(&self, fraction: f64) -> f64 {
        let fraction = if fraction.is_finite() {
            fraction.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.min + (self.max - self.min) * fraction
    }

    pub fn contains(&self, score: f64) -> bool {
        score >= self.min && score <= self.max
    }
}

/// Primary-content hit where the whole query appears as a phrase
pub const PHRASE_BAND: WeightBand = WeightBand::new(1500.0, 2000.0);
/// Primary-content hit where every query word appears somewhere in the block
pub const ALL_WORDS_BAND: WeightBand = WeightBand::new(1000.0, 1499.0);
/// Query length, in chars, at which phrase specificity stops growing
pub const PHRASE_LENGTH_SATURATION: f64 = 50.0;
/// Case-insensitive substring in the correlated working directory
pub const DIRECTORY_SUBSTRING_SCORE: f64 = 50.0;
/// In-order fuzzy character match in the correlated working directory
pub const DIRECTORY_FUZZY_SCORE: f64 = 40.0;

/// Where a search hit came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    PrimaryContent,
    SnapshotSessionName,
    SnapshotCommand,
    SnapshotDirectory,
}

impl Provenance {
    pub const ALL: [Provenance; 4] = [
        Provenance::PrimaryContent,
        Provenance::SnapshotSessionName,
        Provenance::SnapshotCommand,
        Provenance::SnapshotDirectory,
    ];

    pub const fn band(&self) -> WeightBand {
        match self {
            Provenance::PrimaryContent => WeightBand::new(1000.0, 2000.0),
            Provenance::SnapshotSessionName => WeightBand::new(80.0, 100.0),
            Provenance::SnapshotCommand => WeightBand::new(60.0, 60.0),
            Provenance::SnapshotDirectory => WeightBand::new(40.0, 50.0),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::PrimaryContent => "content",
            Provenance::SnapshotSessionName => "snapshot-name",
            Provenance::SnapshotCommand => "snapshot-command",
            Provenance::SnapshotDirectory => "snapshot-directory",
        }
    }

    pub fn is_primary(&self) -> bool {
        matches!(self, Provenance::PrimaryContent)
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One ranked hit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchMatch {
    pub session_id: String,
    /// Position of the session in the index
    pub session_index: usize,
    pub block_sequence: Option<u64>,
    pub role: Option<Role>,
    pub score: f64,
    pub snippet: String,
    pub provenance: Provenance,
}

/// Result limit and hit filters. Block filters (role, language, topic, tool,
/// code) only restrict content hits; the date range also applies to
/// metadata hits through the session's time span.
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    pub limit: Option<usize>,
    pub roles: Option<Vec<Role>>,
    /// Block has a code fragment tagged with one of these languages
    pub languages: Option<Vec<ProgrammingLanguage>>,
    /// Block carries one of these topics, compared case-insensitively
    pub topics: Option<Vec<String>>,
    /// Block invokes one of these tools, compared case-insensitively
    pub tools: Option<Vec<String>>,
    /// Inclusive window. Blocks without a timestamp use the session's
    /// creation time.
    pub date_range: Option<(DateTime<Utc>, DateTime<Utc>)>,
    pub has_code: Option<bool>,
}

fn contains_ignore_case(wanted: &[String], values: &[String]) -> bool {
    values
        .iter()
        .any(|v| wanted.iter().any(|w| w.eq_ignore_ascii_case(v)))
}

impl SearchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_roles(mut self, roles: Vec<Role>) -> Self {
        self.roles = Some(roles);
        self
    }

    pub fn with_languages(mut self, languages: Vec<ProgrammingLanguage>) -> Self {
        self.languages = Some(languages);
        self
    }

    pub fn with_topics(mut self, topics: Vec<String>) -> Self {
        self.topics = Some(topics);
        self
    }

    pub fn with_tools(mut self, tools: Vec<String>) -> Self {
        self.tools = Some(tools);
        self
    }

    pub fn with_date_range(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.date_range = Some((start, end));
        self
    }

    pub fn with_has_code(mut self, has_code: bool) -> Self {
        self.has_code = Some(has_code);
        self
    }

    fn in_range(&self, at: DateTime<Utc>) -> bool {
        self.date_range
            .map_or(true, |(start, end)| at >= start && at <= end)
    }

    fn allows_block(&self, block: &Block, session: &Session) -> bool {
        if let Some(roles) = &self.roles {
            if !roles.contains(&block.role) {
                return false;
            }
        }
        let fragments = &block.content.code_fragments;
        if let Some(has_code) = self.has_code {
            if fragments.is_empty() == has_code {
                return false;
            }
        }
        if let Some(languages) = &self.languages {
            let tagged = fragments
                .iter()
                .filter_map(|f| f.language.as_ref())
                .any(|l| languages.contains(l));
            if !tagged {
                return false;
            }
        }
        if let Some(topics) = &self.topics {
            if !contains_ignore_case(topics, &block.topics) {
                return false;
            }
        }
        if let Some(tools) = &self.tools {
            if !contains_ignore_case(tools, &block.tools) {
                return false;
            }
        }
        self.in_range(block.timestamp.unwrap_or(session.created_at))
    }

    /// Session span overlaps the date range
    fn allows_session(&self, session: &Session) -> bool {
        self.date_range.map_or(true, |(start, end)| {
            session.created_at <= end && session.modified_at >= start
        })
    }
}

/// A trimmed query, lower-cased for content matching
struct Query {
    /// Original text, used for case-sensitive command matching
    raw: String,
    phrase: String,
    phrase_chars: Vec<char>,
    words: Vec<String>,
}

impl Query {
    fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        let phrase = trimmed.to_lowercase();
        let words = phrase.split_whitespace().map(str::to_string).collect();
        Some(Self {
            raw: trimmed.to_string(),
            phrase_chars: phrase.chars().collect(),
            phrase,
            words,
        })
    }
}

/// Search `sessions` in corpus order and rank the hits
pub fn search_sessions(sessions: &[Session], query: &str, options: &SearchOptions) -> Vec<SearchMatch> {
    let Some(query) = Query::parse(query) else {
        return Vec::new();
    };

    let mut matches = Vec::new();
    for (index, session) in sessions.iter().enumerate() {
        for block in session.blocks.iter().filter(|b| options.allows_block(b, session)) {
            if let Some((score, snippet)) = score_block(block, &query) {
                matches.push(SearchMatch {
                    session_id: session.id.clone(),
                    session_index: index,
                    block_sequence: Some(block.sequence),
                    role: Some(block.role),
                    score,
                    snippet,
                    provenance: Provenance::PrimaryContent,
                });
            }
        }

        let snapshot = session.snapshot().filter(|_| options.allows_session(session));
        if let Some(snapshot) = snapshot {
            for (provenance, score, snippet) in score_snapshot(snapshot, &query) {
                matches.push(SearchMatch {
                    session_id: session.id.clone(),
                    session_index: index,
                    block_sequence: None,
                    role: None,
                    score,
                    snippet,
                    provenance,
                });
            }
        }
    }

    // Stable: equal scores keep corpus order
    matches.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    if let Some(limit) = options.limit {
        matches.truncate(limit);
    }
    matches
}

fn score_block(block: &Block, query: &Query) -> Option<(f64, String)> {
    let text = block.raw_text();
    if text.is_empty() {
        return None;
    }
    let lower = text.to_lowercase();
    let text_chars = text.chars().count().max(1) as f64;

    if lower.contains(&query.phrase) {
        // Whole-string and per-char lowercasing can disagree (final sigma)
        let (start, end) = find_case_insensitive(text, &query.phrase_chars).unwrap_or((0, 0));
        let query_len = query.phrase_chars.len() as f64;
        let length_factor = (query_len / PHRASE_LENGTH_SATURATION).min(1.0);
        let coverage = (query_len / text_chars).min(1.0);
        let score = PHRASE_BAND.scale(0.5 * length_factor + 0.5 * coverage);
        return Some((score, create_snippet(text, start, end)));
    }

    if query.words.len() > 1 && query.words.iter().all(|w| lower.contains(w.as_str())) {
        let covered: usize = query.words.iter().map(|w| w.chars().count()).sum();
        let score = ALL_WORDS_BAND.scale(covered as f64 / text_chars);
        let first: Vec<char> = query.words[0].chars().collect();
        let (start, end) = find_case_insensitive(text, &first).unwrap_or((0, 0));
        return Some((score, create_snippet(text, start, end)));
    }

    None
}

fn score_snapshot(snapshot: &SnapshotMetadata, query: &Query) -> Vec<(Provenance, f64, String)> {
    let mut hits = Vec::new();

    let name = snapshot.snapshot_name.to_lowercase();
    if !name.is_empty() && name.contains(&query.phrase) {
        let band = Provenance::SnapshotSessionName.band();
        // A proper substring is strictly shorter, so only an exact name reaches the top
        let ratio = query.phrase_chars.len() as f64 / name.chars().count() as f64;
        let score = if name == query.phrase { band.max } else { band.scale(ratio) };
        hits.push((
            Provenance::SnapshotSessionName,
            score,
            format!("tmux session: {}", snapshot.snapshot_name),
        ));
    }

    if let Some(command) = snapshot.shell_command.as_deref() {
        if command.contains(query.raw.as_str()) {
            hits.push((
                Provenance::SnapshotCommand,
                Provenance::SnapshotCommand.band().min,
                format!("command: {}", command),
            ));
        }
    }

    let dir = snapshot.working_directory.to_lowercase();
    if !dir.is_empty() {
        let score = if dir.contains(&query.phrase) {
            Some(DIRECTORY_SUBSTRING_SCORE)
        } else if fuzzy_contains(&dir, &query.phrase) {
            Some(DIRECTORY_FUZZY_SCORE)
        } else {
            None
        };
        if let Some(score) = score {
            hits.push((
                Provenance::SnapshotDirectory,
                score,
                format!("directory: {}", snapshot.working_directory),
            ));
        }
    }

    hits
}

/// Every non-space char of `needle` appears in `haystack` in order
fn fuzzy_contains(haystack: &str, needle: &str) -> bool {
    let mut chars = haystack.chars();
    needle
        .chars()
        .filter(|c| !c.is_whitespace())
        .all(|n| chars.any(|h| h == n))
}

/// Byte range of the first case-insensitive occurrence of `needle` (already
/// lower-cased) in `haystack`
pub fn find_case_insensitive(haystack: &str, needle: &[char]) -> Option<(usize, usize)> {
    if needle.is_empty() {
        return None;
    }
    for (start, _) in haystack.char_indices() {
        let mut matched = 0;
        for (offset, ch) in haystack[start..].char_indices() {
            let mut ok = true;
            for lower in ch.to_lowercase() {
                if matched < needle.len() && needle[matched] == lower {
                    matched += 1;
                } else {
                    ok = false;
                    break;
                }
            }
            if !ok {
                break;
            }
            if matched == needle.len() {
                return Some((start, start + offset + ch.len_utf8()));
            }
        }
    }
    None
}

/// Cut a snippet around `start..end`: about 100 chars before and 200 after,
/// trimmed to word boundaries, whitespace collapsed
pub fn create_snippet(text: &str, start: usize, end: usize) -> String {
    let start = floor_char_boundary(text, start.min(text.len()));
    let end = floor_char_boundary(text, end.min(text.len())).max(start);

    let mut from = start;
    for (count, (idx, _)) in text[..start].char_indices().rev().enumerate() {
        from = idx;
        if count + 1 >= SNIPPET_BEFORE {
            break;
        }
    }
    let mut to = text.len();
    if let Some((idx, _)) = text[start..].char_indices().nth(SNIPPET_AFTER) {
        to = (start + idx).max(end);
        to = floor_char_boundary(text, to);
    }

    let cut_front = from > 0;
    let cut_back = to < text.len();

    if cut_front {
        if let Some(ws) = text[from..start].find(char::is_whitespace) {
            from += ws;
        }
    }
    if cut_back {
        if let Some(ws) = text[end..to].rfind(char::is_whitespace) {
            to = end + ws;
        }
    }

    let body = text[from..to].split_whitespace().collect::<Vec<_>>().join(" ");
    let mut snippet = String::with_capacity(body.len() + 6);
    if cut_front {
        snippet.push_str("...");
    }
    snippet.push_str(&body);
    if cut_back {
        snippet.push_str("...");
    }
    snippet
}

fn floor_char_boundary(s: &str, mut idx: usize) -> usize {
    while idx > 0 && !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}
