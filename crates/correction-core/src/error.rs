//! Error types of the correction core.

use crate::annotations::TextRange;
use thiserror::Error;

/// Errors raised by annotation and focus operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnnotationError {
    /// Range start/end lies outside the document.
    #[error("range {}..{} is out of bounds (document has {char_count} chars)", .range.start, .range.end)]
    OutOfBounds {
        /// Offending range.
        range: TextRange,
        /// Document length at the time of the call.
        char_count: usize,
    },
    /// An error mark cannot cover zero characters.
    #[error("empty range at {}", .0.start)]
    EmptyRange(TextRange),
    /// No error mark with that exact range.
    #[error("no error mark at {}..{}", .0.start, .0.end)]
    NoErrorAt(TextRange),
    /// The focused error has fewer suggestions than requested.
    #[error("suggestion {index} out of range ({available} available)")]
    SuggestionOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of suggestions on the error.
        available: usize,
    },
    /// The operation needs a focused error and none is active.
    #[error("no active error focus")]
    NoActiveFocus,
}

/// Errors raised when a check cannot be submitted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckError {
    /// Nothing to check.
    #[error("document is empty")]
    EmptyDocument,
    /// The document exceeds the configured limit.
    #[error("document has {char_count} chars, limit is {max_chars}")]
    TooLong {
        /// Document length.
        char_count: usize,
        /// Configured `max_chars`.
        max_chars: usize,
    },
}
