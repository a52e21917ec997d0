//! Inline annotations (error marks and correction marks).
//!
//! Annotations are range-scoped tags anchored to document character offsets. They never modify
//! the text themselves; the [`Document`](crate::Document) shifts them as text is edited and
//! renderers derive styled runs from them.
//!
//! Two kinds exist:
//!
//! - **Error marks** carry the data needed to show a suggestion popover (kind, source,
//!   suggestions, explanation) plus a `corrected` flag used by review mode.
//! - **Correction marks** tag text that was inserted by accepting a suggestion, so hosts can
//!   render it as "now corrected".

use crate::text_error::{ErrorKind, TextError};
use serde::{Deserialize, Serialize};

/// A half-open character-offset range (`start..end`) in the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TextRange {
    /// Range start offset (inclusive), in Unicode scalar values (`char`) from the start of the document.
    pub start: usize,
    /// Range end offset (exclusive), in Unicode scalar values (`char`) from the start of the document.
    pub end: usize,
}

impl TextRange {
    /// Create a new range.
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Length of the range in characters.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Returns `true` if the range covers no characters.
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Check if the range contains a specific position.
    pub fn contains(&self, pos: usize) -> bool {
        self.start <= pos && pos < self.end
    }

    /// Check if two ranges overlap.
    ///
    /// Two ranges overlap when an endpoint of one falls inside the other, or when either
    /// contains the other entirely. Touching ranges (`a.end == b.start`) do not overlap.
    pub fn overlaps(&self, other: &TextRange) -> bool {
        (self.start >= other.start && self.start < other.end)
            || (self.end > other.start && self.end <= other.end)
            || (self.start <= other.start && self.end >= other.end)
    }

    /// Map this range through an insertion of `len` characters at `pos`.
    ///
    /// Ranges starting at or after `pos` move right; ranges spanning `pos` grow.
    pub fn after_insertion(self, pos: usize, len: usize) -> TextRange {
        if self.start >= pos {
            TextRange::new(self.start + len, self.end + len)
        } else if self.end > pos {
            TextRange::new(self.start, self.end + len)
        } else {
            self
        }
    }

    /// Map this range through a deletion of `[start, end)`.
    ///
    /// Returns `None` when the range is entirely inside the deleted text.
    pub fn after_deletion(self, start: usize, end: usize) -> Option<TextRange> {
        let delta = end.saturating_sub(start);
        if delta == 0 || self.end <= start {
            return Some(self);
        }
        if self.start >= end {
            return Some(TextRange::new(self.start - delta, self.end - delta));
        }
        if self.start >= start && self.end <= end {
            return None;
        }
        if self.start < start && self.end > end {
            return Some(TextRange::new(self.start, self.end - delta));
        }
        if self.start < start {
            // Tail clipped.
            return Some(TextRange::new(self.start, start));
        }
        // Head clipped.
        Some(TextRange::new(start, self.end - delta))
    }
}

/// Payload of an error mark.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorMark {
    /// Spelling or grammar.
    pub kind: ErrorKind,
    /// Detector that reported the error.
    pub source: String,
    /// Candidate replacements, the first one is the default.
    pub suggestions: Vec<String>,
    /// Optional human-readable explanation.
    pub explanation: Option<String>,
    /// `true` when a suggestion was accepted in review mode and the original text is still
    /// shown next to the inserted correction.
    pub corrected: bool,
}

impl ErrorMark {
    /// Build the mark payload for a reported error.
    pub fn from_error(error: &TextError) -> Self {
        Self {
            kind: error.kind,
            source: error.source.clone(),
            suggestions: error.suggestions.clone(),
            explanation: error.explanation.clone(),
            corrected: error.corrected,
        }
    }
}

/// What an annotation represents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnnotationKind {
    /// A reported spelling/grammar error.
    Error(ErrorMark),
    /// Text inserted by accepting a suggestion.
    Correction,
}

impl AnnotationKind {
    /// Returns the error payload, if this is an error mark.
    pub fn as_error(&self) -> Option<&ErrorMark> {
        match self {
            Self::Error(mark) => Some(mark),
            Self::Correction => None,
        }
    }

    /// Returns `true` for error marks that still need a user decision.
    pub fn is_pending_error(&self) -> bool {
        matches!(self, Self::Error(mark) if !mark.corrected)
    }
}

/// A single annotation anchored to a document range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    /// Anchor range in character offsets.
    pub range: TextRange,
    /// Annotation payload.
    pub kind: AnnotationKind,
}

impl Annotation {
    /// Create an error mark annotation.
    pub fn error(range: TextRange, mark: ErrorMark) -> Self {
        Self {
            range,
            kind: AnnotationKind::Error(mark),
        }
    }

    /// Create a correction mark annotation.
    pub fn correction(range: TextRange) -> Self {
        Self {
            range,
            kind: AnnotationKind::Correction,
        }
    }
}

/// Sorted list of annotations for one document.
///
/// Annotations are kept ordered by `(start, end)`. Error marks never share a range: inserting
/// an error mark replaces any other error mark on the exact same range.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnotationSet {
    items: Vec<Annotation>,
}

impl AnnotationSet {
    /// Create an empty annotation set.
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Number of annotations.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterate annotations in document order.
    pub fn iter(&self) -> impl Iterator<Item = &Annotation> {
        self.items.iter()
    }

    /// All annotations in document order.
    pub fn as_slice(&self) -> &[Annotation] {
        &self.items
    }

    /// Insert an annotation.
    ///
    /// Returns `false` (and leaves the set untouched) if an identical annotation already exists.
    pub fn insert(&mut self, annotation: Annotation) -> bool {
        if self.items.contains(&annotation) {
            return false;
        }

        if matches!(annotation.kind, AnnotationKind::Error(_)) {
            let range = annotation.range;
            self.items
                .retain(|a| !(a.range == range && matches!(a.kind, AnnotationKind::Error(_))));
        }

        let key = (annotation.range.start, annotation.range.end);
        let pos = self
            .items
            .partition_point(|a| (a.range.start, a.range.end) <= key);
        self.items.insert(pos, annotation);
        true
    }

    /// Remove every annotation matching `pred`. Returns the number removed.
    pub fn remove_where<F>(&mut self, mut pred: F) -> usize
    where
        F: FnMut(&Annotation) -> bool,
    {
        let before = self.items.len();
        self.items.retain(|a| !pred(a));
        before - self.items.len()
    }

    /// Error mark with exactly `range`, if any.
    pub fn error_at(&self, range: TextRange) -> Option<(&TextRange, &ErrorMark)> {
        self.items.iter().find_map(|a| match &a.kind {
            AnnotationKind::Error(mark) if a.range == range => Some((&a.range, mark)),
            _ => None,
        })
    }

    /// Mutable error mark with exactly `range`, if any.
    pub fn error_at_mut(&mut self, range: TextRange) -> Option<&mut ErrorMark> {
        self.items.iter_mut().find_map(|a| match &mut a.kind {
            AnnotationKind::Error(mark) if a.range == range => Some(mark),
            _ => None,
        })
    }

    /// Innermost error mark covering `offset` (used to resolve clicks).
    pub fn error_covering(&self, offset: usize) -> Option<(TextRange, &ErrorMark)> {
        self.items
            .iter()
            .filter(|a| a.range.contains(offset))
            .filter_map(|a| a.kind.as_error().map(|mark| (a.range, mark)))
            .min_by_key(|(range, _)| range.len())
    }

    /// Range of the correction mark that starts exactly at `offset`, if any.
    pub fn correction_starting_at(&self, offset: usize) -> Option<TextRange> {
        self.items
            .iter()
            .find(|a| a.range.start == offset && a.kind == AnnotationKind::Correction)
            .map(|a| a.range)
    }

    /// All annotations overlapping `[start, end)`.
    pub fn query_range(&self, start: usize, end: usize) -> Vec<&Annotation> {
        if start >= end {
            return Vec::new();
        }
        let search_end = self.items.partition_point(|a| a.range.start < end);
        self.items[..search_end]
            .iter()
            .filter(|a| a.range.end > start)
            .collect()
    }

    /// Number of error marks still awaiting a decision.
    pub fn pending_error_count(&self) -> usize {
        self.items
            .iter()
            .filter(|a| a.kind.is_pending_error())
            .count()
    }

    /// Clear all annotations.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Update offsets after inserting `len` characters at `pos`.
    pub fn update_for_insertion(&mut self, pos: usize, len: usize) {
        if len == 0 {
            return;
        }
        for annotation in &mut self.items {
            annotation.range = annotation.range.after_insertion(pos, len);
        }
        self.resort();
    }

    /// Update offsets after deleting `[start, end)`.
    ///
    /// Annotations entirely inside the deleted range are removed, partially covered ones are
    /// clipped.
    pub fn update_for_deletion(&mut self, start: usize, end: usize) {
        if start >= end {
            return;
        }
        self.items.retain_mut(|annotation| {
            match annotation.range.after_deletion(start, end) {
                Some(range) if !range.is_empty() => {
                    annotation.range = range;
                    true
                }
                _ => false,
            }
        });
        self.resort();
    }

    fn resort(&mut self) {
        self.items
            .sort_by_key(|a| (a.range.start, a.range.end));
    }
}
