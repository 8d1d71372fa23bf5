//! session-core - Data model, record parsing and content extraction for session transcripts
//!
//! This crate turns line-delimited session files into [`Session`] values made of
//! ordered [`Block`]s, and derives the searchable sub-structures (tokens, code
//! fragments, links, mentions) of each block. It is synchronous; the async
//! scanning and correlation pipeline lives in `session-indexer`.

pub mod error;
pub mod extract;
pub mod parser;
pub mod record;
pub mod types;

pub use error::*;
pub use extract::*;
pub use parser::*;
pub use record::*;
pub use types::*;
