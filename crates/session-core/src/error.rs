//! Error types for record parsing

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while reading a session file
#[derive(Error, Debug)]
pub enum ParseError {
    /// One line could not be decoded as a record. Absorbed by the file parser
    /// and surfaced only through `lines_skipped`.
    #[error("Line {line} could not be decoded: {source}")]
    LineDecode {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    /// The whole file could not be opened or read.
    #[error("Failed to read {}: {source}", path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ParseError {
    pub fn file_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ParseError::FileRead {
            path: path.into(),
            source,
        }
    }

    /// Whether this error only affects a single line
    pub fn is_line_level(&self) -> bool {
        matches!(self, ParseError::LineDecode { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_read_message_includes_path() {
        let err = ParseError::file_read(
            "/tmp/missing.jsonl",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        let msg = err.to_string();
        assert!(msg.contains("/tmp/missing.jsonl"));
        assert!(msg.contains("gone"));
        assert!(!err.is_line_level());
    }

    #[test]
    fn test_line_decode_is_line_level() {
        let source = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
        let err = ParseError::LineDecode { line: 7, source };
        assert!(err.is_line_level());
        assert!(err.to_string().starts_with("Line 7"));
    }
}
