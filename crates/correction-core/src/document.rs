//! Versioned plain-text + annotation document model.
//!
//! The document stores its text in a [`Rope`] (character-addressed) together with a sorted
//! [`AnnotationSet`]. Every text edit goes through [`Document::replace`], which shifts the
//! annotations and returns a [`TextDelta`] describing the change.
//!
//! Renderers should not read the live document while it is being mutated; instead they take an
//! immutable [`DocumentSnapshot`] and derive styled runs from it via
//! [`DocumentSnapshot::segments`].
//!
//! # Example
//!
//! ```rust
//! use correction_core::{Annotation, Document, TextRange};
//!
//! let mut doc = Document::new("Ele foi pra escola");
//! doc.add_annotation(Annotation::correction(TextRange::new(12, 18))).unwrap();
//!
//! let delta = doc.replace(TextRange::new(8, 11), "para").unwrap();
//! assert_eq!(delta.after_char_count, 19);
//! assert_eq!(doc.text(), "Ele foi para escola");
//! assert_eq!(doc.annotations().as_slice()[0].range, TextRange::new(13, 19));
//! ```

use crate::annotations::{Annotation, AnnotationSet, ErrorMark, TextRange};
use crate::delta::{TextDelta, TextDeltaEdit};
use crate::error::AnnotationError;
use crate::locate::CharIndex;
use ropey::Rope;
use std::sync::Arc;

/// Live document: text, annotations and a version counter.
#[derive(Debug, Clone)]
pub struct Document {
    rope: Rope,
    annotations: AnnotationSet,
    version: u64,
}

impl Document {
    /// Create a document from text, with no annotations.
    pub fn new(text: &str) -> Self {
        Self {
            rope: Rope::from_str(text),
            annotations: AnnotationSet::new(),
            version: 0,
        }
    }

    /// Create an empty document.
    pub fn empty() -> Self {
        Self::new("")
    }

    /// Full plain text.
    pub fn text(&self) -> String {
        self.rope.to_string()
    }

    /// Total character count.
    pub fn char_count(&self) -> usize {
        self.rope.len_chars()
    }

    /// Returns `true` if the document has no text.
    pub fn is_empty(&self) -> bool {
        self.rope.len_chars() == 0
    }

    /// Document version (incremented after each observable change).
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Current annotations.
    pub fn annotations(&self) -> &AnnotationSet {
        &self.annotations
    }

    /// Text covered by `range`, or `None` if out of bounds.
    pub fn slice(&self, range: TextRange) -> Option<String> {
        if range.start > range.end || range.end > self.char_count() {
            return None;
        }
        Some(self.rope.slice(range.start..range.end).to_string())
    }

    fn check_range(&self, range: TextRange) -> Result<(), AnnotationError> {
        if range.start > range.end || range.end > self.char_count() {
            return Err(AnnotationError::OutOfBounds {
                range,
                char_count: self.char_count(),
            });
        }
        Ok(())
    }

    /// Replace `range` with `text`, shifting annotations.
    ///
    /// Annotations entirely inside `range` are dropped; annotations after it move; partially
    /// covered annotations are clipped.
    pub fn replace(&mut self, range: TextRange, text: &str) -> Result<TextDelta, AnnotationError> {
        self.check_range(range)?;

        let before_char_count = self.char_count();
        let deleted_text = self.rope.slice(range.start..range.end).to_string();
        let inserted_len = text.chars().count();

        if !range.is_empty() {
            self.rope.remove(range.start..range.end);
            self.annotations.update_for_deletion(range.start, range.end);
        }
        if inserted_len > 0 {
            self.rope.insert(range.start, text);
            self.annotations.update_for_insertion(range.start, inserted_len);
        }

        let mut edits = Vec::new();
        if !deleted_text.is_empty() || !text.is_empty() {
            edits.push(TextDeltaEdit {
                start: range.start,
                deleted_text,
                inserted_text: text.to_string(),
            });
            self.version += 1;
        }

        Ok(TextDelta {
            before_char_count,
            after_char_count: self.char_count(),
            edits,
        })
    }

    /// Insert `text` at `offset`.
    pub fn insert(&mut self, offset: usize, text: &str) -> Result<TextDelta, AnnotationError> {
        self.replace(TextRange::new(offset, offset), text)
    }

    /// Delete `range`.
    pub fn delete(&mut self, range: TextRange) -> Result<TextDelta, AnnotationError> {
        self.replace(range, "")
    }

    /// Replace the whole text. All annotations are dropped.
    pub fn set_text(&mut self, text: &str) -> TextDelta {
        let before_char_count = self.char_count();
        let deleted_text = self.text();
        self.rope = Rope::from_str(text);
        self.annotations.clear();
        self.version += 1;

        TextDelta {
            before_char_count,
            after_char_count: self.char_count(),
            edits: vec![TextDeltaEdit {
                start: 0,
                deleted_text,
                inserted_text: text.to_string(),
            }],
        }
    }

    /// Add an annotation.
    ///
    /// Returns `Ok(false)` if an identical annotation already exists (no version bump).
    pub fn add_annotation(&mut self, annotation: Annotation) -> Result<bool, AnnotationError> {
        self.check_range(annotation.range)?;
        if annotation.range.is_empty() {
            return Err(AnnotationError::EmptyRange(annotation.range));
        }
        let inserted = self.annotations.insert(annotation);
        if inserted {
            self.version += 1;
        }
        Ok(inserted)
    }

    /// Remove annotations matching `pred`. Returns the number removed.
    pub fn remove_annotations<F>(&mut self, pred: F) -> usize
    where
        F: FnMut(&Annotation) -> bool,
    {
        let removed = self.annotations.remove_where(pred);
        if removed > 0 {
            self.version += 1;
        }
        removed
    }

    /// Remove the error mark with exactly `range`. Returns the removed payload.
    pub fn remove_error_mark(&mut self, range: TextRange) -> Option<ErrorMark> {
        let mark = self.annotations.error_at(range).map(|(_, m)| m.clone())?;
        self.remove_annotations(|a| a.range == range && a.kind.as_error().is_some());
        Some(mark)
    }

    /// Set the `corrected` flag of the error mark at `range`.
    pub fn set_error_corrected(&mut self, range: TextRange, corrected: bool) -> bool {
        match self.annotations.error_at_mut(range) {
            Some(mark) if mark.corrected != corrected => {
                mark.corrected = corrected;
                self.version += 1;
                true
            }
            _ => false,
        }
    }

    /// Remove every annotation. Returns the number removed.
    pub fn clear_annotations(&mut self) -> usize {
        self.remove_annotations(|_| true)
    }

    /// Returns `true` if any error mark still awaits a decision.
    pub fn has_pending_errors(&self) -> bool {
        self.annotations.pending_error_count() > 0
    }

    /// Take an immutable snapshot of text + annotations.
    pub fn snapshot(&self) -> Arc<DocumentSnapshot> {
        Arc::new(DocumentSnapshot {
            version: self.version,
            text: self.text(),
            annotations: self.annotations.as_slice().to_vec(),
        })
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::empty()
    }
}

/// A run of text and the annotations covering it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Character range of this run.
    pub range: TextRange,
    /// Text of this run.
    pub text: String,
    /// Indices into [`DocumentSnapshot::annotations`] of annotations covering the run.
    pub annotations: Vec<usize>,
}

/// Immutable view of a document at one version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSnapshot {
    /// Version the snapshot was taken at.
    pub version: u64,
    /// Full plain text.
    pub text: String,
    /// Annotations in document order.
    pub annotations: Vec<Annotation>,
}

impl DocumentSnapshot {
    /// Total character count.
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    /// Split the text into runs with a constant set of covering annotations.
    ///
    /// Runs are contiguous and cover the whole text; unannotated runs have an empty
    /// `annotations` list.
    pub fn segments(&self) -> Vec<Segment> {
        let index = CharIndex::new(&self.text);
        let char_count = index.char_count();

        let mut bounds: Vec<usize> = Vec::with_capacity(self.annotations.len() * 2 + 2);
        bounds.push(0);
        bounds.push(char_count);
        for annotation in &self.annotations {
            bounds.push(annotation.range.start.min(char_count));
            bounds.push(annotation.range.end.min(char_count));
        }
        bounds.sort_unstable();
        bounds.dedup();

        bounds
            .windows(2)
            .filter_map(|w| {
                let range = TextRange::new(w[0], w[1]);
                let text = index.slice(&self.text, range)?.to_string();
                let annotations = self
                    .annotations
                    .iter()
                    .enumerate()
                    .filter(|(_, a)| a.range.start <= range.start && a.range.end >= range.end)
                    .map(|(idx, _)| idx)
                    .collect();
                Some(Segment {
                    range,
                    text,
                    annotations,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text_error::ErrorKind;

    fn mark() -> ErrorMark {
        ErrorMark {
            kind: ErrorKind::Spelling,
            source: "ai".to_string(),
            suggestions: vec!["para".to_string()],
            explanation: None,
            corrected: false,
        }
    }

    #[test]
    fn test_replace_produces_delta_and_bumps_version() {
        let mut doc = Document::new("abc def");
        let delta = doc.replace(TextRange::new(4, 7), "xy").unwrap();
        assert_eq!(doc.text(), "abc xy");
        assert_eq!(doc.version(), 1);
        assert_eq!(delta.before_char_count, 7);
        assert_eq!(delta.after_char_count, 6);
        assert_eq!(delta.edits[0].deleted_text, "def");
        assert_eq!(delta.edits[0].inserted_text, "xy");
    }

    #[test]
    fn test_noop_replace_keeps_version() {
        let mut doc = Document::new("abc");
        let delta = doc.replace(TextRange::new(1, 1), "").unwrap();
        assert!(delta.is_empty());
        assert_eq!(doc.version(), 0);
    }

    #[test]
    fn test_replace_out_of_bounds() {
        let mut doc = Document::new("abc");
        assert!(matches!(
            doc.replace(TextRange::new(2, 5), "x"),
            Err(AnnotationError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_add_annotation_is_idempotent() {
        let mut doc = Document::new("Ele foi pra escola");
        let a = Annotation::error(TextRange::new(8, 11), mark());
        assert!(doc.add_annotation(a.clone()).unwrap());
        let version = doc.version();
        assert!(!doc.add_annotation(a).unwrap());
        assert_eq!(doc.version(), version);
    }

    #[test]
    fn test_snapshot_segments() {
        let mut doc = Document::new("Ele foi pra escola");
        doc.add_annotation(Annotation::error(TextRange::new(8, 11), mark()))
            .unwrap();
        let snapshot = doc.snapshot();
        let segments = snapshot.segments();

        let texts: Vec<&str> = segments.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["Ele foi ", "pra", " escola"]);
        assert_eq!(segments[1].annotations, vec![0]);
        assert!(segments[0].annotations.is_empty());
    }

    #[test]
    fn test_empty_document_has_no_segments() {
        let doc = Document::empty();
        assert!(doc.snapshot().segments().is_empty());
    }
}
