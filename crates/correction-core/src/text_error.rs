//! Reported spelling/grammar errors.
//!
//! A [`TextError`] is one issue reported by an external correction service. Offsets are
//! character offsets into the plain text the service saw, which may no longer match the live
//! document; see [`normalize`](crate::normalize) for how they are reconciled.

use crate::annotations::TextRange;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    /// Misspelled word.
    Spelling,
    /// Grammar issue.
    Grammar,
}

impl ErrorKind {
    /// Wire name (`"spelling"` / `"grammar"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Spelling => "spelling",
            Self::Grammar => "grammar",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single reported issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextError {
    /// The exact substring the service believes is wrong.
    pub word: String,
    /// Start character offset (inclusive) as understood by the service.
    pub start: usize,
    /// End character offset (exclusive) as understood by the service.
    pub end: usize,
    /// Spelling or grammar.
    #[serde(rename = "type")]
    pub kind: ErrorKind,
    /// Detector tag, used for priority ordering.
    pub source: String,
    /// Candidate replacements, the first one is the default.
    #[serde(default)]
    pub suggestions: Vec<String>,
    /// Optional human-readable explanation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    /// Whether this error's mark currently represents an applied correction awaiting
    /// confirmation.
    #[serde(default)]
    pub corrected: bool,
}

impl TextError {
    /// Create an error without suggestions or explanation.
    pub fn new(
        word: impl Into<String>,
        start: usize,
        end: usize,
        kind: ErrorKind,
        source: impl Into<String>,
    ) -> Self {
        Self {
            word: word.into(),
            start,
            end,
            kind,
            source: source.into(),
            suggestions: Vec::new(),
            explanation: None,
            corrected: false,
        }
    }

    /// Attach suggestions.
    pub fn with_suggestions<I, S>(mut self, suggestions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.suggestions = suggestions.into_iter().map(Into::into).collect();
        self
    }

    /// Attach an explanation.
    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = Some(explanation.into());
        self
    }

    /// The claimed `[start, end)` range.
    pub fn range(&self) -> TextRange {
        TextRange::new(self.start, self.end)
    }
}
