//! Structured error types for stallwatch
//!
//! Using thiserror for automatic Display implementation and error chaining.

use super::types::{HeaderDefect, SkippedStanza};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Nothing in the input looked like a well-formed thread stanza.
    #[error("No thread stanzas found in dump ({skipped} malformed stanzas skipped)")]
    NoThreadsFound { skipped: usize },

    /// Never returned from `parse`; recorded as a skipped stanza instead.
    #[error("Malformed thread header at line {line}: {defect}")]
    MalformedHeader { line: usize, defect: HeaderDefect },
}

impl From<SkippedStanza> for ParseError {
    fn from(skipped: SkippedStanza) -> Self {
        ParseError::MalformedHeader { line: skipped.line, defect: skipped.defect }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DetectError {
    #[error("Chronic block detection needs at least 2 snapshots, got {provided}")]
    InsufficientSnapshots { provided: usize },
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Detect(#[from] DetectError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}
