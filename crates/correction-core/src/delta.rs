//! Text change records.
//!
//! Every mutation of a [`Document`](crate::Document) (user typing, an accepted suggestion, a
//! committed review correction) yields a [`TextDelta`]. Anything that holds offsets into the
//! text, such as the normalized error set, the focused error or a host cursor, is moved
//! through the delta rather than recomputed.
//!
//! Offsets are character offsets.

use crate::annotations::TextRange;

/// One replacement: `deleted_text` at `start` became `inserted_text`.
///
/// `start` refers to the text as it was just before this edit; edits of one [`TextDelta`]
/// apply in sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextDeltaEdit {
    /// Where the replacement begins.
    pub start: usize,
    /// Text that was removed.
    pub deleted_text: String,
    /// Text that took its place.
    pub inserted_text: String,
}

impl TextDeltaEdit {
    /// Removed characters.
    pub fn deleted_len(&self) -> usize {
        self.deleted_text.chars().count()
    }

    /// Inserted characters.
    pub fn inserted_len(&self) -> usize {
        self.inserted_text.chars().count()
    }

    /// End of the removed span, before the edit.
    pub fn end(&self) -> usize {
        self.start.saturating_add(self.deleted_len())
    }

    /// Where `range` sits after this edit, or `None` if the edit removed all of it.
    pub fn map_range(&self, range: TextRange) -> Option<TextRange> {
        let range = range.after_deletion(self.start, self.end())?;
        let range = range.after_insertion(self.start, self.inserted_len());
        (!range.is_empty()).then_some(range)
    }

    /// Where a caret at `offset` sits after this edit.
    ///
    /// A caret inside the removed span lands after the inserted text.
    pub fn map_offset(&self, offset: usize) -> usize {
        if offset >= self.end() {
            offset - self.deleted_len() + self.inserted_len()
        } else if offset > self.start {
            self.start + self.inserted_len()
        } else {
            offset
        }
    }
}

/// All edits produced by one document operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextDelta {
    /// Text length before the operation.
    pub before_char_count: usize,
    /// Text length after the operation.
    pub after_char_count: usize,
    /// Edits, in application order.
    pub edits: Vec<TextDeltaEdit>,
}

impl TextDelta {
    /// `true` when the operation changed nothing.
    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// Move `range` through every edit, in order.
    pub fn map_range(&self, range: TextRange) -> Option<TextRange> {
        self.edits
            .iter()
            .try_fold(range, |range, edit| edit.map_range(range))
    }

    /// Move a caret through every edit, in order.
    pub fn map_offset(&self, offset: usize) -> usize {
        self.edits
            .iter()
            .fold(offset, |offset, edit| edit.map_offset(offset))
    }
}
