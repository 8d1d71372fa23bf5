//! Streaming parser for line-delimited session files

use crate::error::ParseError;
use crate::extract::{extract_content, topics_for};
use crate::record::RawRecord;
use crate::types::{Block, Role, Session};
use chrono::{DateTime, Utc};
use std::io::{BufRead, BufReader, ErrorKind};
use std::path::{Path, PathBuf};

/// Outcome of parsing one file
#[derive(Debug)]
pub struct ParsedFile {
    pub path: PathBuf,
    /// `None` when the file is empty or no line decoded
    pub session: Option<Session>,
    pub records_decoded: usize,
    pub lines_skipped: usize,
    pub line_count: usize,
}

impl ParsedFile {
    pub fn is_empty(&self) -> bool {
        self.session.is_none()
    }
}

/// Decode one line. Blank lines yield `Ok(None)`.
pub fn parse_line(raw: &str, line: usize) -> Result<Option<RawRecord>, ParseError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    serde_json::from_str::<RawRecord>(trimmed)
        .map(Some)
        .map_err(|source| ParseError::LineDecode { line, source })
}

/// Parse an RFC 3339 timestamp, `None` if it does not parse
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Turn a decoded record into a block. Records without any text produce none.
pub fn block_from_record(record: RawRecord, sequence: u64) -> Option<Block> {
    let resolved = record.resolve_text();
    if resolved.is_empty() && resolved.tools.is_empty() {
        return None;
    }

    let mut role = record
        .role_label()
        .map(Role::from_label)
        .unwrap_or(Role::Unknown);
    if resolved.has_tool_parts && (record.explicit_role().is_none() || role == Role::Unknown) {
        role = Role::Tool;
    }

    let content = extract_content(&resolved.text);
    let topics = topics_for(&content, &resolved.tools);

    Some(Block {
        sequence,
        role,
        timestamp: record.timestamp.as_deref().and_then(parse_timestamp),
        uuid: record.uuid,
        parent_uuid: record.parent_uuid,
        content,
        tools: resolved.tools,
        topics,
        extra: record.extra,
    })
}

/// Parse a session file from disk
pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<ParsedFile, ParseError> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(|e| ParseError::file_read(path, e))?;
    let metadata = file.metadata().map_err(|e| ParseError::file_read(path, e))?;
    let modified = metadata.modified().ok().map(DateTime::<Utc>::from);

    let mut parsed = parse_reader(BufReader::new(file), path, modified)?;
    if let Some(session) = parsed.session.as_mut() {
        session.file_size_bytes = metadata.len();
    }
    Ok(parsed)
}

/// Parse session records from any buffered reader.
///
/// Lines that fail to decode, including lines that are not valid UTF-8, are
/// counted in `lines_skipped`. Any other read error aborts the file.
pub fn parse_reader<R: BufRead>(
    reader: R,
    path: &Path,
    file_modified: Option<DateTime<Utc>>,
) -> Result<ParsedFile, ParseError> {
    let mut builder = SessionBuilder::default();
    let mut line_count = 0usize;
    let mut lines_skipped = 0usize;
    let mut records_decoded = 0usize;

    for line_result in reader.lines() {
        line_count += 1;
        let raw = match line_result {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::InvalidData => {
                lines_skipped += 1;
                tracing::debug!(path = %path.display(), line = line_count, "skipping non-UTF-8 line");
                continue;
            }
            Err(e) => return Err(ParseError::file_read(path, e)),
        };

        match parse_line(&raw, line_count) {
            Ok(Some(record)) => {
                records_decoded += 1;
                builder.absorb(record, line_count as u64);
            }
            Ok(None) => {}
            Err(e) => {
                lines_skipped += 1;
                tracing::debug!(path = %path.display(), error = %e, "skipping malformed line");
            }
        }
    }

    let session = (records_decoded > 0).then(|| {
        let mut session = builder.finish(path, file_modified);
        session.line_count = line_count;
        session.lines_skipped = lines_skipped;
        session
    });

    if lines_skipped > 0 {
        tracing::debug!(
            path = %path.display(),
            records = records_decoded,
            skipped = lines_skipped,
            "parsed file with malformed lines"
        );
    }

    Ok(ParsedFile {
        path: path.to_path_buf(),
        session,
        records_decoded,
        lines_skipped,
        line_count,
    })
}

/// Accumulates session-level fields while records stream in
#[derive(Default)]
struct SessionBuilder {
    session_id: Option<String>,
    cwd: Option<String>,
    slug: Option<String>,
    git_branch: Option<String>,
    model: Option<String>,
    blocks: Vec<Block>,
}

impl SessionBuilder {
    fn absorb(&mut self, mut record: RawRecord, sequence: u64) {
        fill_once(&mut self.session_id, record.session_id.take());
        fill_once(&mut self.cwd, record.cwd.take());
        fill_once(&mut self.slug, record.slug.take());
        fill_once(&mut self.git_branch, record.git_branch.take());
        fill_once(&mut self.model, record.model().map(str::to_string));

        if let Some(block) = block_from_record(record, sequence) {
            self.blocks.push(block);
        }
    }

    fn finish(self, path: &Path, file_modified: Option<DateTime<Utc>>) -> Session {
        let fallback = file_modified.unwrap_or_else(Utc::now);
        let id = self
            .session_id
            .unwrap_or_else(|| session_id_from_path(path));

        let mut session = Session::new(id, path, fallback);
        session.project_path = self.cwd.or_else(|| project_path_from_file(path));
        session.slug = self.slug;
        session.git_branch = self.git_branch;
        session.model = self.model;

        let mut stamps = self.blocks.iter().filter_map(|b| b.timestamp);
        if let Some(first) = stamps.next() {
            session.created_at = first;
            session.modified_at = stamps.last().unwrap_or(first);
        }

        for block in self.blocks {
            session.push_block(block);
        }
        session.refresh_statistics();
        session
    }
}

fn fill_once(slot: &mut Option<String>, value: Option<String>) {
    if slot.is_none() {
        *slot = value.filter(|v| !v.trim().is_empty());
    }
}

/// Identifier derived from the file name: the stem, minus a `session-` prefix
pub fn session_id_from_path(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    match stem.strip_prefix("session-") {
        Some(rest) if !rest.is_empty() => rest.to_string(),
        _ => stem,
    }
}

/// Working directory encoded in the parent directory name, if it uses the
/// dash encoding (`-Users-me-app`)
pub fn project_path_from_file(path: &Path) -> Option<String> {
    let dir_name = path.parent()?.file_name()?.to_str()?;
    if !dir_name.starts_with('-') {
        return None;
    }
    Some(decode_project_dir(dir_name))
}

/// Decode an encoded project directory name: `--` becomes `/.`, then `-` becomes `/`
pub fn decode_project_dir(name: &str) -> String {
    name.replace("--", "/.").replace('-', "/")
}
