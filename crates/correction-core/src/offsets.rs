//! Plain-text ↔ editor position mapping.
//!
//! Block-structured editors (one paragraph node per `\n`-separated line) count an opening token
//! before each block's content. A plain-text offset `p` therefore sits at editor position
//! `p + number of block starts at or before p`, where block starts are offset `0` and every
//! offset directly after a `\n`.
//!
//! This module is the only place that performs that adjustment; range ends go through the same
//! function as range starts.
//!
//! ```rust
//! use correction_core::offsets::to_editor_offset;
//!
//! let text = "ab\ncd";
//! assert_eq!(to_editor_offset(text, 0), 1);
//! assert_eq!(to_editor_offset(text, 2), 3);
//! assert_eq!(to_editor_offset(text, 3), 5);
//! ```

use crate::annotations::{Annotation, TextRange};
use crate::document::DocumentSnapshot;

/// A `[from, to)` range in editor positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EditorRange {
    /// Start position.
    pub from: usize,
    /// End position (exclusive).
    pub to: usize,
}

/// Block-start table for one text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorCoordinates {
    block_starts: Vec<usize>,
    char_count: usize,
}

impl EditorCoordinates {
    /// Build the table for `text`.
    pub fn from_text(text: &str) -> Self {
        let mut block_starts = vec![0];
        let mut char_count = 0;
        for (idx, ch) in text.chars().enumerate() {
            if ch == '\n' {
                block_starts.push(idx + 1);
            }
            char_count = idx + 1;
        }
        Self {
            block_starts,
            char_count,
        }
    }

    /// Number of blocks (paragraphs).
    pub fn block_count(&self) -> usize {
        self.block_starts.len()
    }

    /// Map a plain-text offset to an editor position.
    ///
    /// Offsets past the end are clamped to the end of the text.
    pub fn to_editor_offset(&self, plain: usize) -> usize {
        let plain = plain.min(self.char_count);
        let blocks_before = self.block_starts.partition_point(|&start| start <= plain);
        plain + blocks_before
    }

    /// Map an editor position back to a plain-text offset.
    ///
    /// Positions on a block boundary token resolve to the nearest offset inside the block.
    pub fn to_plain_offset(&self, editor: usize) -> usize {
        let blocks = self
            .block_starts
            .iter()
            .enumerate()
            .take_while(|&(k, &start)| start + k + 1 <= editor)
            .count();
        if blocks == 0 {
            return 0;
        }

        let k = blocks - 1;
        let plain = editor - (k + 1);
        let block_end = self
            .block_starts
            .get(k + 1)
            .map_or(self.char_count, |next| next - 1);
        plain.min(block_end)
    }

    /// Map a plain-text range to editor positions.
    pub fn to_editor_range(&self, range: TextRange) -> EditorRange {
        EditorRange {
            from: self.to_editor_offset(range.start),
            to: self.to_editor_offset(range.end),
        }
    }
}

/// Map a plain-text offset of `text` to an editor position.
pub fn to_editor_offset(text: &str, plain: usize) -> usize {
    EditorCoordinates::from_text(text).to_editor_offset(plain)
}

/// One annotation expressed in editor positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorMarkOp {
    /// Target range in editor positions.
    pub range: EditorRange,
    /// The annotation to apply there.
    pub annotation: Annotation,
}

/// List every annotation of `snapshot` in editor positions, in document order.
pub fn editor_mark_ops(snapshot: &DocumentSnapshot) -> Vec<EditorMarkOp> {
    let coords = EditorCoordinates::from_text(&snapshot.text);
    snapshot
        .annotations
        .iter()
        .map(|annotation| EditorMarkOp {
            range: coords.to_editor_range(annotation.range),
            annotation: annotation.clone(),
        })
        .collect()
}
