//! The reconciled set of currently active errors.

use crate::annotations::TextRange;
use crate::delta::TextDelta;
use crate::text_error::{ErrorKind, TextError};

/// Normalized, non-overlapping errors owned by one session.
///
/// Rebuilt wholesale from each report, shrunk as errors are resolved, and kept aligned with the
/// live text through [`apply_delta`](Self::apply_delta).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedErrorSet {
    errors: Vec<TextError>,
}

impl NormalizedErrorSet {
    /// Wrap the output of the normalizer.
    pub fn new(errors: Vec<TextError>) -> Self {
        Self { errors }
    }

    /// Number of errors (including corrected ones awaiting commit).
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Iterate errors in normalized order.
    pub fn iter(&self) -> impl Iterator<Item = &TextError> {
        self.errors.iter()
    }

    /// All errors in normalized order.
    pub fn as_slice(&self) -> &[TextError] {
        &self.errors
    }

    /// Number of pending (not yet corrected) errors of `kind`.
    pub fn count(&self, kind: ErrorKind) -> usize {
        self.errors
            .iter()
            .filter(|e| e.kind == kind && !e.corrected)
            .count()
    }

    /// Number of pending errors of any kind.
    pub fn pending_count(&self) -> usize {
        self.errors.iter().filter(|e| !e.corrected).count()
    }

    /// Error with exactly `range`.
    pub fn find_at(&self, range: TextRange) -> Option<&TextError> {
        self.errors.iter().find(|e| e.range() == range)
    }

    /// Remove the error with exactly `range`.
    pub fn remove_at(&mut self, range: TextRange) -> Option<TextError> {
        let idx = self.errors.iter().position(|e| e.range() == range)?;
        Some(self.errors.remove(idx))
    }

    /// Set the `corrected` flag of the error at `range`. Returns `false` if there is none.
    pub fn mark_corrected(&mut self, range: TextRange, corrected: bool) -> bool {
        match self.errors.iter_mut().find(|e| e.range() == range) {
            Some(error) => {
                error.corrected = corrected;
                true
            }
            None => false,
        }
    }

    /// Remove every corrected error. Returns the number removed.
    pub fn remove_corrected(&mut self) -> usize {
        let before = self.errors.len();
        self.errors.retain(|e| !e.corrected);
        before - self.errors.len()
    }

    /// Shift every range through `delta`; errors whose text was deleted are dropped.
    pub fn apply_delta(&mut self, delta: &TextDelta) {
        if delta.is_empty() {
            return;
        }
        self.errors.retain_mut(|error| match delta.map_range(error.range()) {
            Some(range) => {
                error.start = range.start;
                error.end = range.end;
                true
            }
            None => false,
        });
    }

    /// Remove every error.
    pub fn clear(&mut self) {
        self.errors.clear();
    }
}
