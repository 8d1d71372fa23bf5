//! Content extraction: tokens, code fragments, links and mentions
//!
//! Everything here is heuristic. Misclassification only affects ranking
//! quality, so no function in this module returns an error; anything that
//! does not fit a more specific category is a [`TokenType::Word`].

use crate::types::{
    BlockContent, CodeFragment, ContentToken, Link, LinkType, Mention, MentionType,
    ProgrammingLanguage, TokenType,
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

static RE_MD_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([^\]\n]+)\]\(([^)\s]+)\)").unwrap());
static RE_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"https?://[^\s<>()\[\]"'`]+"#).unwrap());
static RE_INLINE_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"`([^`\n]+)`").unwrap());

/// Commands recognised at the start of a prose line
const COMMAND_WORDS: &[&str] = &[
    "cargo", "git", "npm", "npx", "yarn", "pnpm", "bun", "node", "python", "python3", "pip",
    "docker", "kubectl", "make", "go", "rustc", "rustup", "ls", "cd", "cat", "grep", "rg", "find",
    "curl", "ssh", "tmux", "brew", "sudo",
];

const FILE_EXTENSIONS: &[&str] = &[
    "rs", "toml", "md", "json", "jsonl", "yaml", "yml", "ts", "tsx", "js", "jsx", "py", "go",
    "java", "c", "h", "cpp", "hpp", "cs", "rb", "swift", "kt", "sh", "sql", "html", "css", "txt",
    "lock", "log", "conf", "cfg", "ini", "xml", "env",
];

/// Trailing characters that end a sentence rather than a token
const SENTENCE_PUNCT: &[char] = &['.', ',', ';', ':', '!', '?', '"', '\''];
const LEADING_PUNCT: &[char] = &['(', '[', '"', '\''];

/// A fenced code region as byte offsets into the source text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Fence {
    /// Start of the opening fence line
    start: usize,
    /// End of the closing fence line, newline included
    end: usize,
    /// Body range between the fence lines
    body_start: usize,
    body_end: usize,
    tag_start: usize,
    tag_end: usize,
}

/// Derive the full searchable structure of a block's text
pub fn extract_content(raw_text: &str) -> BlockContent {
    let fences = find_fences(raw_text);
    let prose = prose_segments(raw_text, &fences);

    let mut code_fragments: Vec<CodeFragment> = fences
        .iter()
        .map(|f| {
            let tag = raw_text[f.tag_start..f.tag_end].trim();
            CodeFragment {
                language: tag
                    .split_whitespace()
                    .next()
                    .map(ProgrammingLanguage::from_tag),
                content: raw_text[f.body_start..f.body_end].to_string(),
                inline: false,
                start: f.start,
                end: f.end,
            }
        })
        .collect();

    let mut tokens = Vec::new();
    let mut character_count = 0;
    for &(offset, segment) in &prose {
        character_count += segment.chars().count();
        tokens.extend(tokenize_at(segment, offset));
        code_fragments.extend(inline_code(segment, offset));
    }
    code_fragments.sort_by_key(|c| c.start);

    // Fenced bodies never reach the tokenizer; inline spans are dropped here
    let inline_spans: Vec<(usize, usize)> = code_fragments
        .iter()
        .filter(|c| c.inline)
        .map(|c| (c.start, c.end))
        .collect();
    let word_count = tokens
        .iter()
        .filter(|t| t.token_type != TokenType::Punctuation)
        .filter(|t| {
            !inline_spans
                .iter()
                .any(|&(start, end)| t.position >= start && t.position < end)
        })
        .count();

    let links = extract_links(raw_text);
    let mentions = extract_mentions(&tokens, &prose, &fences, raw_text);

    BlockContent {
        raw_text: raw_text.to_string(),
        tokens,
        code_fragments,
        links,
        mentions,
        word_count,
        character_count,
    }
}

/// Find terminated ``` fences. An opening fence without a closing one is ignored.
fn find_fences(text: &str) -> Vec<Fence> {
    let mut fences = Vec::new();
    let mut open: Option<(usize, usize, usize, usize)> = None;
    let mut offset = 0;

    for line in text.split_inclusive('\n') {
        let line_start = offset;
        offset += line.len();
        let trimmed = line.trim_start();
        if !trimmed.starts_with("```") {
            continue;
        }
        match open.take() {
            None => {
                let tag_start = line_start + (line.len() - trimmed.len()) + 3;
                let tag_end = line_start + line.trim_end().len();
                open = Some((line_start, tag_start, tag_end.max(tag_start), offset));
            }
            Some((start, tag_start, tag_end, body_start)) => {
                fences.push(Fence {
                    start,
                    end: offset,
                    body_start,
                    body_end: line_start,
                    tag_start,
                    tag_end,
                });
            }
        }
    }
    fences
}

/// Text outside fenced regions, with each segment's byte offset
fn prose_segments<'a>(text: &'a str, fences: &[Fence]) -> Vec<(usize, &'a str)> {
    let mut segments = Vec::new();
    let mut cursor = 0;
    for fence in fences {
        if fence.start > cursor {
            segments.push((cursor, &text[cursor..fence.start]));
        }
        cursor = fence.end;
    }
    if cursor < text.len() {
        segments.push((cursor, &text[cursor..]));
    }
    segments
}

/// Split prose on whitespace and classify each run
pub fn tokenize(text: &str) -> Vec<ContentToken> {
    tokenize_at(text, 0)
}

fn tokenize_at(text: &str, base: usize) -> Vec<ContentToken> {
    let mut tokens = Vec::new();
    let mut start: Option<usize> = None;

    for (idx, ch) in text.char_indices() {
        if ch.is_whitespace() {
            if let Some(s) = start.take() {
                tokens.push(make_token(&text[s..idx], base + s));
            }
        } else if start.is_none() {
            start = Some(idx);
        }
    }
    if let Some(s) = start {
        tokens.push(make_token(&text[s..], base + s));
    }
    tokens
}

fn make_token(run: &str, position: usize) -> ContentToken {
    ContentToken {
        text: run.to_string(),
        token_type: classify(run),
        position,
        length: run.len(),
    }
}

/// Classify one whitespace-delimited run
pub fn classify(run: &str) -> TokenType {
    if run.chars().all(|c| c.is_ascii_punctuation()) {
        return TokenType::Punctuation;
    }
    let core = strip_wrapping(run);
    if core.is_empty() {
        return TokenType::Word;
    }
    if is_url(core) {
        TokenType::Url
    } else if core.len() > 1 && core.starts_with('`') && core.ends_with('`') {
        TokenType::Code
    } else if is_number(core) {
        TokenType::Number
    } else if looks_like_path(core) {
        TokenType::FilePath
    } else if looks_like_code(core) {
        TokenType::Code
    } else {
        TokenType::Word
    }
}

/// Strip sentence punctuation and unbalanced closing brackets around a run
fn strip_wrapping(run: &str) -> &str {
    let mut s = run
        .trim_start_matches(LEADING_PUNCT)
        .trim_end_matches(SENTENCE_PUNCT);
    loop {
        let unbalanced = (s.ends_with(')') && s.matches(')').count() > s.matches('(').count())
            || (s.ends_with(']') && s.matches(']').count() > s.matches('[').count());
        if !unbalanced {
            return s;
        }
        s = s[..s.len() - 1].trim_end_matches(SENTENCE_PUNCT);
    }
}

fn is_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://") || s.starts_with("www.")
}

fn is_number(s: &str) -> bool {
    let digits = s.strip_prefix('-').unwrap_or(s);
    let digits = digits.strip_suffix('%').unwrap_or(digits);
    !digits.is_empty()
        && digits.chars().any(|c| c.is_ascii_digit())
        && digits
            .chars()
            .all(|c| c.is_ascii_digit() || c == '.' || c == ',' || c == '_')
}

/// Path-like: rooted, relative with `./`, home-relative, or slash-separated with a known extension
pub fn looks_like_path(s: &str) -> bool {
    let s = s.trim_matches('`');
    if s.len() < 2 || s.contains("://") {
        return false;
    }
    if s.starts_with("~/") || s.starts_with("./") || s.starts_with("../") {
        return true;
    }
    if s.starts_with('/') {
        return s[1..]
            .chars()
            .next()
            .is_some_and(|c| c.is_alphanumeric() || c == '.' || c == '_');
    }
    if s.contains('/') {
        return has_known_extension(s) || s.split('/').filter(|p| !p.is_empty()).count() >= 3;
    }
    has_known_extension(s) && s.chars().next().is_some_and(|c| c.is_alphanumeric() || c == '.')
}

fn has_known_extension(s: &str) -> bool {
    let file = s.rsplit('/').next().unwrap_or(s);
    let Some((stem, ext)) = file.rsplit_once('.') else {
        return false;
    };
    let ext = ext.split(':').next().unwrap_or(ext);
    (!stem.is_empty() || file.starts_with('.'))
        && FILE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str())
}

/// Code-like: call syntax, paths through modules, operators, or identifiers with `_`/`::`
pub fn looks_like_code(s: &str) -> bool {
    s.contains("::")
        || s.contains("()")
        || s.contains("=>")
        || s.contains("->")
        || s.contains("==")
        || s.contains("!=")
        || s.contains("&&")
        || s.contains("||")
        || (s.contains('(') && s.ends_with(')'))
        || (s.contains('_') && s.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '.'))
        || (s.contains('{') && s.contains('}'))
}

fn inline_code(segment: &str, base: usize) -> Vec<CodeFragment> {
    RE_INLINE_CODE
        .captures_iter(segment)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let inner = caps.get(1)?.as_str();
            if inner.trim().is_empty() || !inline_looks_like_code(inner) {
                return None;
            }
            Some(CodeFragment {
                language: None,
                content: inner.to_string(),
                inline: true,
                start: base + whole.start(),
                end: base + whole.end(),
            })
        })
        .collect()
}

fn inline_looks_like_code(s: &str) -> bool {
    looks_like_code(s)
        || looks_like_path(s)
        || s.contains(' ')
        || s.contains('.')
        || s.contains('-')
        || (s.chars().any(|c| c.is_ascii_uppercase()) && s.chars().any(|c| c.is_ascii_lowercase()))
}

/// Extract markdown links first, then bare URLs not already covered
pub fn extract_links(text: &str) -> Vec<Link> {
    let mut links = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for caps in RE_MD_LINK.captures_iter(text) {
        let (Some(title), Some(url)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        let url = url.as_str().to_string();
        if seen.insert(url.clone()) {
            links.push(Link {
                link_type: classify_link(&url),
                title: Some(title.as_str().to_string()),
                url,
            });
        }
    }

    for m in RE_URL.find_iter(text) {
        let url = m.as_str().trim_end_matches(SENTENCE_PUNCT).to_string();
        if seen.insert(url.clone()) {
            links.push(Link {
                link_type: classify_link(&url),
                title: None,
                url,
            });
        }
    }
    links
}

pub fn classify_link(url: &str) -> LinkType {
    let lower = url.to_ascii_lowercase();
    if lower.starts_with("file://") || !(lower.starts_with("http://") || lower.starts_with("https://")) {
        return LinkType::File;
    }
    if ["github.com", "gitlab.com", "bitbucket.org", "codeberg.org"]
        .iter()
        .any(|host| lower.contains(host))
    {
        LinkType::Repository
    } else if lower.contains("docs.")
        || lower.contains("/docs")
        || lower.contains("docs.rs")
        || lower.contains("developer.")
        || lower.contains("/reference")
        || lower.contains("readthedocs")
        || lower.contains("/api/")
    {
        LinkType::Documentation
    } else {
        LinkType::External
    }
}

fn extract_mentions(
    tokens: &[ContentToken],
    prose: &[(usize, &str)],
    fences: &[Fence],
    raw_text: &str,
) -> Vec<Mention> {
    let mut mentions = Vec::new();
    let mut seen: HashSet<(MentionType, String)> = HashSet::new();
    let mut push = |text: String, mention_type: MentionType| {
        if !text.is_empty() && seen.insert((mention_type, text.clone())) {
            mentions.push(Mention { text, mention_type });
        }
    };

    for token in tokens.iter().filter(|t| t.token_type == TokenType::FilePath) {
        let path = strip_wrapping(&token.text).trim_matches('`');
        push(path.to_string(), MentionType::File);
    }

    for &(_, segment) in prose {
        for line in segment.lines() {
            if let Some(cmd) = command_from_line(line) {
                push(cmd, MentionType::Command);
            }
        }
    }

    for fence in fences {
        let tag = raw_text[fence.tag_start..fence.tag_end].trim();
        if ProgrammingLanguage::from_tag(tag) != ProgrammingLanguage::Shell {
            continue;
        }
        for line in raw_text[fence.body_start..fence.body_end].lines() {
            let line = line.trim();
            let line = line.strip_prefix("$ ").unwrap_or(line);
            if !line.is_empty() && !line.starts_with('#') {
                push(line.to_string(), MentionType::Command);
            }
        }
    }

    mentions
}

/// A `$ cmd` line, or a line starting with a known command word
fn command_from_line(line: &str) -> Option<String> {
    let trimmed = line.trim();
    if let Some(rest) = trimmed.strip_prefix("$ ") {
        let rest = rest.trim();
        return (!rest.is_empty()).then(|| rest.to_string());
    }
    let unquoted = trimmed.trim_matches('`');
    let first = unquoted.split_whitespace().next()?;
    if COMMAND_WORDS.contains(&first) && unquoted.split_whitespace().count() > 1 {
        return Some(unquoted.to_string());
    }
    None
}

/// Topic tags: fenced code languages followed by tool names, lower-cased and de-duplicated
pub fn topics_for(content: &BlockContent, tools: &[String]) -> Vec<String> {
    let mut topics: Vec<String> = Vec::new();
    let languages = content
        .code_fragments
        .iter()
        .filter(|c| !c.inline)
        .filter_map(|c| c.language.as_ref())
        .map(|l| l.name().to_ascii_lowercase());
    for topic in languages.chain(tools.iter().map(|t| t.to_ascii_lowercase())) {
        if !topic.is_empty() && !topics.contains(&topic) {
            topics.push(topic);
        }
    }
    topics
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fenced_code_excluded_from_word_count() {
        let text = "Here is the fix:\n```rust\nfn main() { println!(\"hi\"); }\n```\nThat should work.";
        let content = extract_content(text);
        assert_eq!(content.code_fragments.len(), 1);
        let fragment = &content.code_fragments[0];
        assert_eq!(fragment.language, Some(ProgrammingLanguage::Rust));
        assert_eq!(fragment.content, "fn main() { println!(\"hi\"); }\n");
        assert!(!fragment.inline);
        assert_eq!(content.word_count, 7);
        assert!(content.tokens.iter().all(|t| !t.text.contains("println")));
    }

    #[test]
    fn test_unterminated_fence_stays_prose() {
        let content = extract_content("start\n```python\nprint(1)\n");
        assert!(content.code_fragments.iter().all(|c| c.inline));
        assert!(content.tokens.iter().any(|t| t.text == "print(1)"));
    }

    #[test]
    fn test_fence_without_language() {
        let content = extract_content("```\nplain\n```\n");
        assert_eq!(content.code_fragments.len(), 1);
        assert_eq!(content.code_fragments[0].language, None);
        assert_eq!(content.word_count, 0);
    }

    #[test]
    fn test_token_classification() {
        assert_eq!(classify("hello"), TokenType::Word);
        assert_eq!(classify("42"), TokenType::Number);
        assert_eq!(classify("3.14,"), TokenType::Number);
        assert_eq!(classify("--"), TokenType::Punctuation);
        assert_eq!(classify("https://example.com/x"), TokenType::Url);
        assert_eq!(classify("src/main.rs"), TokenType::FilePath);
        assert_eq!(classify("/etc/hosts."), TokenType::FilePath);
        assert_eq!(classify("~/notes"), TokenType::FilePath);
        assert_eq!(classify("`foo`"), TokenType::Code);
        assert_eq!(classify("Vec::new()"), TokenType::Code);
        assert_eq!(classify("print(1)"), TokenType::Code);
        assert_eq!(classify("(42)"), TokenType::Number);
        assert_eq!(classify("parse_file"), TokenType::Code);
        assert_eq!(classify("and/or"), TokenType::Word);
    }

    #[test]
    fn test_token_positions_are_byte_offsets() {
        let text = "é ab\n```\ncode\n```\nzz";
        let content = extract_content(text);
        for token in &content.tokens {
            assert_eq!(&text[token.position..token.position + token.length], token.text);
        }
        let texts: Vec<_> = content.tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["é", "ab", "zz"]);
    }

    #[test]
    fn test_inline_code() {
        let content = extract_content("Call `Session::new` then `ok`.");
        let inline: Vec<_> = content.code_fragments.iter().filter(|c| c.inline).collect();
        assert_eq!(inline.len(), 1);
        assert_eq!(inline[0].content, "Session::new");
    }

    #[test]
    fn test_inline_code_excluded_from_word_count() {
        let content = extract_content("Call `Session::new` then `ok`.");
        assert_eq!(content.word_count, 3);

        let content = extract_content("Run `cargo test --all` now");
        assert_eq!(content.tokens.len(), 5);
        assert_eq!(content.word_count, 2);
    }

    #[test]
    fn test_links() {
        let text = "See [the docs](https://docs.rs/tokio) and https://github.com/tokio-rs/tokio. Also https://example.com/page, fine.";
        let links = extract_links(text);
        assert_eq!(links.len(), 3);
        assert_eq!(links[0].title.as_deref(), Some("the docs"));
        assert_eq!(links[0].link_type, LinkType::Documentation);
        assert_eq!(links[1].url, "https://github.com/tokio-rs/tokio");
        assert_eq!(links[1].link_type, LinkType::Repository);
        assert_eq!(links[2].url, "https://example.com/page");
        assert_eq!(links[2].link_type, LinkType::External);
        assert_eq!(classify_link("./README.md"), LinkType::File);
    }

    #[test]
    fn test_mentions() {
        let text = "Edit src/lib.rs and Cargo.toml\n$ cargo test --workspace\ngit status\n```bash\n$ ls -la\n# comment\n```";
        let content = extract_content(text);
        let files: Vec<_> = content.mentions_of(MentionType::File).map(|m| m.text.as_str()).collect();
        assert_eq!(files, vec!["src/lib.rs", "Cargo.toml"]);
        let commands: Vec<_> = content
            .mentions_of(MentionType::Command)
            .map(|m| m.text.as_str())
            .collect();
        assert_eq!(commands, vec!["cargo test --workspace", "git status", "ls -la"]);
    }

    #[test]
    fn test_topics() {
        let content = extract_content("```rust\nlet x = 1;\n```\n```Rust\nlet y = 2;\n```");
        let topics = topics_for(&content, &["Bash".to_string(), "bash".to_string()]);
        assert_eq!(topics, vec!["rust".to_string(), "bash".to_string()]);
    }

    #[test]
    fn test_never_panics_on_odd_input() {
        for text in ["", "```", "``` ```", "`", "[x](", "\u{0}\u{ffff}", "```\n```\n```"] {
            let _ = extract_content(text);
        }
    }
}
