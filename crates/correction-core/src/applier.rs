//! Applying normalized errors to a document and resolving them.
//!
//! The applier is the only component that turns user decisions into text edits. Every edit
//! goes through [`Document::replace`], and every resulting [`TextDelta`] is returned so callers
//! can keep their own ranges (normalized set, focus) aligned.

use crate::annotations::{Annotation, ErrorMark, TextRange};
use crate::config::AcceptMode;
use crate::delta::TextDelta;
use crate::document::Document;
use crate::error::AnnotationError;
use crate::text_error::TextError;

/// Result of accepting one suggestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptOutcome {
    /// Text changes, in the order they were applied.
    pub deltas: Vec<TextDelta>,
    /// Range of the inserted suggestion in the post-edit document.
    pub replaced: TextRange,
    /// `true` when no pending error marks remain.
    pub all_resolved: bool,
}

/// Result of accepting every suggestion at once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AcceptAllOutcome {
    /// Number of errors replaced by their default suggestion.
    pub accepted: usize,
    /// Number of review-mode corrections committed first.
    pub committed: usize,
    /// Text changes, in the order they were applied.
    pub deltas: Vec<TextDelta>,
}

/// Marks errors in a [`Document`] and applies accept / ignore decisions.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnnotationApplier {
    mode: AcceptMode,
}

impl AnnotationApplier {
    /// Create an applier with the given accept behaviour.
    pub fn new(mode: AcceptMode) -> Self {
        Self { mode }
    }

    /// Accept behaviour in use.
    pub fn mode(&self) -> AcceptMode {
        self.mode
    }

    /// Mark `error` in the document.
    ///
    /// Returns `Ok(false)` when an identical mark is already present.
    pub fn apply(&self, doc: &mut Document, error: &TextError) -> Result<bool, AnnotationError> {
        doc.add_annotation(Annotation::error(error.range(), ErrorMark::from_error(error)))
    }

    /// Accept `suggestion` for the error marked at `range`.
    ///
    /// In [`AcceptMode::Replace`] the marked text is replaced by the suggestion and the error
    /// mark is removed. In [`AcceptMode::Review`] the suggestion is inserted after the marked
    /// text and the mark is flagged as corrected; a later accept on the same mark swaps the
    /// inserted text.
    pub fn accept_suggestion(
        &self,
        doc: &mut Document,
        range: TextRange,
        suggestion: &str,
    ) -> Result<AcceptOutcome, AnnotationError> {
        let mark = doc
            .annotations()
            .error_at(range)
            .map(|(_, mark)| mark.clone())
            .ok_or(AnnotationError::NoErrorAt(range))?;

        let (deltas, replaced) = match self.mode {
            AcceptMode::Replace => {
                let mut deltas = Vec::new();
                if mark.corrected {
                    if let Some(previous) = doc.annotations().correction_starting_at(range.end) {
                        deltas.push(doc.delete(previous)?);
                    }
                }
                doc.remove_error_mark(range);
                let (delta, replaced) = replace_with_correction(doc, range, suggestion)?;
                deltas.push(delta);
                (deltas, replaced)
            }
            AcceptMode::Review => {
                let target = match doc.annotations().correction_starting_at(range.end) {
                    Some(previous) if mark.corrected => previous,
                    _ => TextRange::new(range.end, range.end),
                };
                let (delta, replaced) = replace_with_correction(doc, target, suggestion)?;
                doc.set_error_corrected(range, true);
                (vec![delta], replaced)
            }
        };

        Ok(AcceptOutcome {
            deltas,
            replaced,
            all_resolved: !doc.has_pending_errors(),
        })
    }

    /// Remove the error mark at `range`, leaving the text untouched.
    pub fn ignore(&self, doc: &mut Document, range: TextRange) -> Result<ErrorMark, AnnotationError> {
        doc.remove_error_mark(range)
            .ok_or(AnnotationError::NoErrorAt(range))
    }

    /// Replace every pending error that has suggestions with its first suggestion, then remove
    /// all remaining error marks.
    ///
    /// Review-mode corrections are committed first. Replacements run from the end of the
    /// document backwards so earlier ranges stay valid.
    pub fn accept_all(&self, doc: &mut Document) -> AcceptAllOutcome {
        let mut deltas = self.commit_corrections(doc);
        let committed = deltas.len();

        let mut targets: Vec<(TextRange, String)> = doc
            .annotations()
            .iter()
            .filter_map(|a| match a.kind.as_error() {
                Some(mark) if !mark.corrected => mark
                    .suggestions
                    .first()
                    .map(|suggestion| (a.range, suggestion.clone())),
                _ => None,
            })
            .collect();
        targets.sort_by(|a, b| b.0.start.cmp(&a.0.start));

        let mut accepted = 0;
        for (range, suggestion) in targets {
            doc.remove_error_mark(range);
            match replace_with_correction(doc, range, &suggestion) {
                Ok((delta, _)) => {
                    deltas.push(delta);
                    accepted += 1;
                }
                Err(err) => tracing::warn!(%err, "skipping correction during accept-all"),
            }
        }

        doc.remove_annotations(|a| a.kind.as_error().is_some());

        AcceptAllOutcome {
            accepted,
            committed,
            deltas,
        }
    }

    /// Delete the original text of every corrected (review-mode) error mark.
    pub fn commit_corrections(&self, doc: &mut Document) -> Vec<TextDelta> {
        let mut corrected: Vec<TextRange> = doc
            .annotations()
            .iter()
            .filter(|a| a.kind.as_error().is_some_and(|mark| mark.corrected))
            .map(|a| a.range)
            .collect();
        corrected.sort_by(|a, b| b.start.cmp(&a.start));

        let mut deltas = Vec::with_capacity(corrected.len());
        for range in corrected {
            doc.remove_error_mark(range);
            match doc.delete(range) {
                Ok(delta) => deltas.push(delta),
                Err(err) => tracing::warn!(%err, "skipping corrected mark during commit"),
            }
        }
        deltas
    }

    /// Remove every annotation. Returns the number removed.
    pub fn clear(&self, doc: &mut Document) -> usize {
        doc.clear_annotations()
    }
}

fn replace_with_correction(
    doc: &mut Document,
    range: TextRange,
    suggestion: &str,
) -> Result<(TextDelta, TextRange), AnnotationError> {
    let delta = doc.replace(range, suggestion)?;
    let replaced = TextRange::new(range.start, range.start + suggestion.chars().count());
    if !replaced.is_empty() {
        doc.add_annotation(Annotation::correction(replaced))?;
    }
    Ok((delta, replaced))
}
