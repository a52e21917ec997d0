//! Span location over plain text.
//!
//! All public inputs/outputs are **character offsets** (not byte offsets). The locator is used
//! when a reported error's claimed range no longer spells the reported word: it searches
//! forward from a cursor for the next occurrence of that word.
//!
//! Plain words are escaped and compiled into a regex, which gives case-insensitive and
//! whole-word matching for free.

use crate::annotations::TextRange;
use regex::{Regex, RegexBuilder};
use std::cell::RefCell;
use std::collections::HashMap;

/// Options that control how relocation searches are performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocateOptions {
    /// If `true`, performs a case-sensitive search.
    pub case_sensitive: bool,
    /// If `true`, matches only whole words (alphanumeric and `_` boundaries).
    pub whole_word: bool,
}

impl Default for LocateOptions {
    fn default() -> Self {
        Self {
            case_sensitive: true,
            whole_word: false,
        }
    }
}

/// Byte/char offset table for one text.
#[derive(Debug)]
pub(crate) struct CharIndex {
    char_to_byte: Vec<usize>,
    text_len: usize,
}

impl CharIndex {
    pub(crate) fn new(text: &str) -> Self {
        let mut char_to_byte: Vec<usize> = text.char_indices().map(|(b, _)| b).collect();
        char_to_byte.push(text.len());
        Self {
            char_to_byte,
            text_len: text.len(),
        }
    }

    pub(crate) fn char_count(&self) -> usize {
        self.char_to_byte.len().saturating_sub(1)
    }

    pub(crate) fn char_to_byte(&self, char_offset: usize) -> usize {
        let clamped = char_offset.min(self.char_count());
        self.char_to_byte
            .get(clamped)
            .copied()
            .unwrap_or(self.text_len)
    }

    pub(crate) fn byte_to_char(&self, byte_offset: usize) -> usize {
        let clamped = byte_offset.min(self.text_len);
        match self.char_to_byte.binary_search(&clamped) {
            Ok(idx) => idx,
            Err(idx) => idx,
        }
    }

    /// Slice `text` by a character range. Returns `None` if the range is out of bounds.
    pub(crate) fn slice<'t>(&self, text: &'t str, range: TextRange) -> Option<&'t str> {
        if range.start > range.end || range.end > self.char_count() {
            return None;
        }
        text.get(self.char_to_byte(range.start)..self.char_to_byte(range.end))
    }

    fn char_at(&self, text: &str, char_offset: usize) -> Option<char> {
        if char_offset >= self.char_count() {
            return None;
        }
        let start = self.char_to_byte[char_offset];
        let end = self.char_to_byte[char_offset + 1];
        text.get(start..end)?.chars().next()
    }
}

fn is_word_char(ch: char) -> bool {
    ch == '_' || ch.is_alphanumeric()
}

/// Forward searcher bound to one document text.
#[derive(Debug)]
pub struct SpanLocator<'a> {
    text: &'a str,
    index: CharIndex,
    options: LocateOptions,
    /// Compiled pattern per searched word.
    patterns: RefCell<HashMap<String, Regex>>,
}

impl<'a> SpanLocator<'a> {
    /// Create a locator over `text`.
    pub fn new(text: &'a str, options: LocateOptions) -> Self {
        Self {
            text,
            index: CharIndex::new(text),
            options,
            patterns: RefCell::new(HashMap::new()),
        }
    }

    /// Total characters in the searched text.
    pub fn char_count(&self) -> usize {
        self.index.char_count()
    }

    /// Returns the text covered by `range`, or `None` if it is out of bounds.
    pub fn slice(&self, range: TextRange) -> Option<&'a str> {
        self.index.slice(self.text, range)
    }

    /// Returns `true` if `range` spells exactly `word`.
    pub fn matches_at(&self, word: &str, range: TextRange) -> bool {
        !range.is_empty() && self.slice(range) == Some(word)
    }

    /// Find the first occurrence of `word` at or after `search_from`.
    ///
    /// Returns `None` if `word` is empty or does not occur.
    pub fn locate(&self, word: &str, search_from: usize) -> Option<TextRange> {
        let re = self.compile(word)?;
        self.find_from(&re, search_from)
    }

    /// Find the first occurrence of `word` at or after `search_from` that does not overlap any
    /// of `claimed`.
    pub fn locate_unclaimed(
        &self,
        word: &str,
        search_from: usize,
        claimed: &[TextRange],
    ) -> Option<TextRange> {
        let re = self.compile(word)?;
        let mut from = search_from;
        loop {
            let found = self.find_from(&re, from)?;
            if !claimed.iter().any(|c| c.overlaps(&found)) {
                return Some(found);
            }
            from = found.start + 1;
        }
    }

    /// Find every non-overlapping occurrence of `word`.
    pub fn locate_all(&self, word: &str) -> Vec<TextRange> {
        let Some(re) = self.compile(word) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        let mut from = 0;
        while let Some(found) = self.find_from(&re, from) {
            from = found.end;
            out.push(found);
        }
        out
    }

    fn find_from(&self, re: &Regex, search_from: usize) -> Option<TextRange> {
        let mut start_char = search_from.min(self.index.char_count());
        loop {
            let start_byte = self.index.char_to_byte(start_char);
            let m = re.find_at(self.text, start_byte)?;

            let candidate = TextRange::new(
                self.index.byte_to_char(m.start()),
                self.index.byte_to_char(m.end()),
            );

            if candidate.is_empty() {
                if candidate.end >= self.index.char_count() {
                    return None;
                }
                start_char = candidate.end + 1;
                continue;
            }

            if self.options.whole_word && !self.is_whole_word(candidate) {
                start_char = candidate.start + 1;
                continue;
            }

            return Some(candidate);
        }
    }

    /// Search options in effect.
    pub fn options(&self) -> LocateOptions {
        self.options
    }

    fn compile(&self, word: &str) -> Option<Regex> {
        if word.is_empty() {
            return None;
        }
        if let Some(re) = self.patterns.borrow().get(word) {
            return Some(re.clone());
        }
        match RegexBuilder::new(&regex::escape(word))
            .case_insensitive(!self.options.case_sensitive)
            .build()
        {
            Ok(re) => {
                self.patterns
                    .borrow_mut()
                    .insert(word.to_string(), re.clone());
                Some(re)
            }
            Err(err) => {
                tracing::warn!(%err, word, "failed to compile locator pattern");
                None
            }
        }
    }

    fn is_whole_word(&self, m: TextRange) -> bool {
        let before = if m.start == 0 {
            None
        } else {
            self.index.char_at(self.text, m.start - 1)
        };
        let after = self.index.char_at(self.text, m.end);

        !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
    }
}

/// Find `word` in `text` at or after `search_from` with default options.
pub fn locate(text: &str, word: &str, search_from: usize) -> Option<TextRange> {
    SpanLocator::new(text, LocateOptions::default()).locate(word, search_from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locate_forward_from_cursor() {
        let text = "o qe disse qe sim";
        assert_eq!(locate(text, "qe", 0), Some(TextRange::new(2, 4)));
        assert_eq!(locate(text, "qe", 3), Some(TextRange::new(11, 13)));
        assert_eq!(locate(text, "qe", 12), None);
        assert_eq!(locate(text, "", 0), None);
    }

    #[test]
    fn test_locate_uses_char_offsets() {
        let text = "ação e não";
        assert_eq!(locate(text, "não", 0), Some(TextRange::new(7, 10)));
    }

    #[test]
    fn test_locate_whole_word_and_case() {
        let text = "Pra prato pra";
        let locator = SpanLocator::new(
            text,
            LocateOptions {
                case_sensitive: false,
                whole_word: true,
            },
        );
        assert_eq!(locator.locate("pra", 1), Some(TextRange::new(10, 13)));
        assert_eq!(locator.locate_all("pra").len(), 2);
    }

    #[test]
    fn test_locate_unclaimed_skips_claimed() {
        let text = "qe qe qe";
        let locator = SpanLocator::new(text, LocateOptions::default());
        let claimed = [TextRange::new(0, 2), TextRange::new(3, 5)];
        assert_eq!(
            locator.locate_unclaimed("qe", 0, &claimed),
            Some(TextRange::new(6, 8))
        );
    }

    #[test]
    fn test_matches_at_rejects_out_of_bounds() {
        let locator = SpanLocator::new("abc", LocateOptions::default());
        assert!(locator.matches_at("bc", TextRange::new(1, 3)));
        assert!(!locator.matches_at("bc", TextRange::new(2, 4)));
    }

    #[test]
    fn test_pattern_is_compiled_once_per_word() {
        let locator = SpanLocator::new("qe qe qe", LocateOptions::default());
        let claimed = [TextRange::new(0, 2)];
        assert_eq!(locator.locate_unclaimed("qe", 0, &claimed), Some(TextRange::new(3, 5)));
        assert_eq!(locator.locate("qe", 4), Some(TextRange::new(6, 8)));
        assert_eq!(locator.locate_all("qe").len(), 3);
        assert_eq!(locator.patterns.borrow().len(), 1);
    }
}
