//! Error types for the merge engines.

use thiserror::Error;

use crate::jsonc::ParseError;

/// Result type alias for merge operations.
pub type MergeResult<T> = Result<T, MergeError>;

/// Errors that can occur while merging.
///
/// Schema discrepancies are never errors; they are reported through
/// [`crate::MergeDiagnostics`].
#[derive(Error, Debug)]
pub enum MergeError {
    #[error("Failed to parse {document} config: {source}")]
    Parse {
        document: &'static str,
        #[source]
        source: ParseError,
    },

    #[error("Overlapping edits at offsets {first} and {second}")]
    OverlappingEdits { first: usize, second: usize },

    #[error("Edit {offset}..{end} is outside the document ({len} bytes)")]
    EditOutOfBounds { offset: usize, end: usize, len: usize },
}
