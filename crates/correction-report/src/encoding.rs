//! Offset conversion between wire encodings and character offsets.
//!
//! Correction services written for browsers report JavaScript string indices, i.e. UTF-16 code
//! units. The core works in Unicode scalar values. Conversions are relative to the text that
//! was submitted with the request.

use correction_core::{OffsetEncoding, TextError};

/// Convert a character offset to a UTF-16 code unit offset.
pub fn char_to_utf16_offset(text: &str, char_offset: usize) -> usize {
    text.chars().take(char_offset).map(char::len_utf16).sum()
}

/// Convert a UTF-16 code unit offset to a character offset.
///
/// An offset pointing inside a surrogate pair resolves to the following character.
pub fn utf16_to_char_offset(text: &str, utf16_offset: usize) -> usize {
    let mut current_utf16 = 0;
    let mut char_count = 0;

    for ch in text.chars() {
        if current_utf16 >= utf16_offset {
            break;
        }
        current_utf16 += ch.len_utf16();
        char_count += 1;
    }

    char_count
}

/// Prefix table for repeated UTF-16 → char lookups on one text.
#[derive(Debug, Clone)]
pub struct Utf16Index {
    /// UTF-16 offset at each char boundary (len = char count + 1).
    boundaries: Vec<usize>,
}

impl Utf16Index {
    /// Build the table for `text`.
    pub fn new(text: &str) -> Self {
        let mut boundaries = Vec::with_capacity(text.len() + 1);
        let mut acc = 0;
        boundaries.push(0);
        for ch in text.chars() {
            acc += ch.len_utf16();
            boundaries.push(acc);
        }
        Self { boundaries }
    }

    /// Character count of the indexed text.
    pub fn char_count(&self) -> usize {
        self.boundaries.len() - 1
    }

    /// UTF-16 length of the indexed text.
    pub fn utf16_len(&self) -> usize {
        self.boundaries.last().copied().unwrap_or(0)
    }

    /// Convert a UTF-16 offset to a character offset.
    ///
    /// Offsets past the end keep their distance from the end, so out-of-range (stale) offsets
    /// stay out of range after conversion.
    pub fn to_char(&self, utf16_offset: usize) -> usize {
        let len = self.utf16_len();
        if utf16_offset > len {
            return self.char_count() + (utf16_offset - len);
        }
        self.boundaries.partition_point(|&b| b < utf16_offset)
    }
}

/// Rewrite wire offsets of `errors` into character offsets of `text`.
pub fn convert_offsets(text: &str, errors: &mut [TextError], encoding: OffsetEncoding) {
    match encoding {
        OffsetEncoding::Char => {}
        OffsetEncoding::Utf16 => {
            let index = Utf16Index::new(text);
            for error in errors {
                error.start = index.to_char(error.start);
                error.end = index.to_char(error.end);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use correction_core::ErrorKind;

    #[test]
    fn test_free_functions_agree_with_index() {
        let text = "a😀b ção";
        let index = Utf16Index::new(text);
        for utf16 in 0..=index.utf16_len() {
            assert_eq!(index.to_char(utf16), utf16_to_char_offset(text, utf16), "{utf16}");
        }
        assert_eq!(char_to_utf16_offset(text, 2), 3);
    }

    #[test]
    fn test_surrogate_pairs() {
        let text = "😀 qe";
        // JS: "😀".length == 2, so "qe" starts at 3.
        let mut errors = vec![TextError::new("qe", 3, 5, ErrorKind::Spelling, "ai")];
        convert_offsets(text, &mut errors, OffsetEncoding::Utf16);
        assert_eq!((errors[0].start, errors[0].end), (2, 4));
    }

    #[test]
    fn test_out_of_range_stays_out_of_range() {
        let index = Utf16Index::new("😀ab");
        assert_eq!(index.utf16_len(), 4);
        assert_eq!(index.to_char(4), 3);
        assert_eq!(index.to_char(6), 5);
    }

    #[test]
    fn test_char_encoding_is_identity() {
        let mut errors = vec![TextError::new("qe", 3, 5, ErrorKind::Spelling, "ai")];
        convert_offsets("😀 qe", &mut errors, OffsetEncoding::Char);
        assert_eq!((errors[0].start, errors[0].end), (3, 5));
    }
}
