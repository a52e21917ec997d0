//! Error normalization: reconcile a reported batch against the live text.
//!
//! Reports are computed on the text as it was when the check was submitted. By the time they
//! arrive the user may have typed, so claimed offsets can be stale. Normalization:
//!
//! 1. splits the batch into errors from the preferred detector and errors from everyone else
//!    (input order is kept inside each group);
//! 2. accepts every error whose claimed range still spells its word;
//! 3. relocates the remaining ones by searching forward for the word, starting from a per-word
//!    cursor so repeated words resolve to successive occurrences;
//! 4. drops anything that cannot be located, or that would overlap an already accepted error.
//!
//! Non-preferred errors whose claimed range overlaps an accepted preferred error are dropped
//! before any relocation is attempted.
//!
//! ```rust
//! use correction_core::{ErrorKind, TextError, normalize};
//!
//! // The user typed two characters in front of the text after submitting it.
//! let text = "xxo qe disse qe sim";
//! let raw = vec![
//!     TextError::new("qe", 2, 4, ErrorKind::Spelling, "ai"),
//!     TextError::new("qe", 11, 13, ErrorKind::Spelling, "ai"),
//! ];
//! let normalized = normalize(&raw, text, "ai");
//! assert_eq!((normalized[0].start, normalized[0].end), (4, 6));
//! assert_eq!((normalized[1].start, normalized[1].end), (13, 15));
//! ```

use crate::annotations::TextRange;
use crate::config::CheckerConfig;
use crate::locate::{LocateOptions, SpanLocator};
use crate::text_error::TextError;
use std::collections::HashMap;

/// Reconciles reported errors against a text.
#[derive(Debug, Clone)]
pub struct Normalizer {
    preferred_source: String,
    options: LocateOptions,
}

impl Normalizer {
    /// Create a normalizer that gives priority to `preferred_source`.
    pub fn new(preferred_source: impl Into<String>) -> Self {
        Self {
            preferred_source: preferred_source.into(),
            options: LocateOptions::default(),
        }
    }

    /// Use custom relocation search options.
    pub fn with_options(mut self, options: LocateOptions) -> Self {
        self.options = options;
        self
    }

    /// Build a normalizer from session configuration.
    pub fn from_config(config: &CheckerConfig) -> Self {
        Self::new(config.preferred_source.clone()).with_options(config.locate_options())
    }

    /// Detector whose errors win overlaps.
    pub fn preferred_source(&self) -> &str {
        &self.preferred_source
    }

    /// Normalize `raw` against `text`.
    ///
    /// The result holds accepted preferred errors followed by accepted other errors, each in
    /// input order. No two returned ranges overlap, and every returned range spells its word.
    pub fn normalize(&self, raw: &[TextError], text: &str) -> Vec<TextError> {
        self.normalize_with_claimed(raw, text, &[])
    }

    /// Normalize `raw` against `text`, treating `claimed` as already occupied.
    ///
    /// No returned range overlaps `claimed`: exact matches on a claimed range are relocated,
    /// and relocation skips claimed occurrences.
    pub fn normalize_with_claimed(
        &self,
        raw: &[TextError],
        text: &str,
        claimed: &[TextRange],
    ) -> Vec<TextError> {
        let locator = SpanLocator::new(text, self.options);

        let (preferred, other): (Vec<&TextError>, Vec<&TextError>) = raw
            .iter()
            .filter(|error| {
                let valid = !error.word.is_empty() && error.start <= error.end;
                if !valid {
                    tracing::debug!(word = %error.word, start = error.start, end = error.end, "dropping malformed error");
                }
                valid
            })
            .partition(|error| error.source == self.preferred_source);

        let mut pass = Pass {
            locator: &locator,
            claimed: claimed.to_vec(),
            cursors: HashMap::new(),
        };

        let mut out = pass.run(&preferred);
        let preferred_ranges: Vec<TextRange> = out.iter().map(TextError::range).collect();

        let other: Vec<&TextError> = other
            .into_iter()
            .filter(|error| {
                let shadowed = preferred_ranges.iter().any(|r| r.overlaps(&error.range()));
                if shadowed {
                    tracing::debug!(word = %error.word, source = %error.source, "dropping error shadowed by preferred source");
                }
                !shadowed
            })
            .collect();
        out.extend(pass.run(&other));

        tracing::debug!(reported = raw.len(), kept = out.len(), "normalized report");
        out
    }
}

/// Shared state across the preferred and other groups.
struct Pass<'l, 't> {
    locator: &'l SpanLocator<'t>,
    claimed: Vec<TextRange>,
    cursors: HashMap<String, usize>,
}

impl Pass<'_, '_> {
    /// Occurrences of one word share a cursor; case is folded when the search ignores it.
    fn cursor_key(&self, word: &str) -> String {
        if self.locator.options().case_sensitive {
            word.to_string()
        } else {
            word.to_lowercase()
        }
    }

    fn is_free(&self, range: TextRange) -> bool {
        !self.claimed.iter().any(|c| c.overlaps(&range))
    }

    fn run(&mut self, group: &[&TextError]) -> Vec<TextError> {
        let mut slots: Vec<Option<TextError>> = vec![None; group.len()];

        for (slot, error) in slots.iter_mut().zip(group) {
            let range = error.range();
            if self.locator.matches_at(&error.word, range) && self.is_free(range) {
                self.claimed.push(range);
                *slot = Some((*error).clone());
            }
        }

        for (slot, error) in slots.iter_mut().zip(group) {
            if slot.is_some() {
                continue;
            }
            let key = self.cursor_key(&error.word);
            let from = self.cursors.get(&key).copied().unwrap_or(0);
            match self
                .locator
                .locate_unclaimed(&error.word, from, &self.claimed)
            {
                Some(found) => {
                    tracing::debug!(
                        word = %error.word,
                        from = error.start,
                        to = found.start,
                        "relocated stale error"
                    );
                    self.cursors.insert(key, found.start + 1);
                    self.claimed.push(found);
                    let mut relocated = (*error).clone();
                    relocated.start = found.start;
                    relocated.end = found.end;
                    // A case-insensitive hit may spell the word differently.
                    if let Some(matched) = self.locator.slice(found) {
                        relocated.word = matched.to_string();
                    }
                    *slot = Some(relocated);
                }
                None => {
                    tracing::debug!(word = %error.word, start = error.start, "dropping unlocatable error");
                }
            }
        }

        slots.into_iter().flatten().collect()
    }
}

/// Normalize `raw` against `text` with default search options.
pub fn normalize(raw: &[TextError], text: &str, preferred_source: &str) -> Vec<TextError> {
    Normalizer::new(preferred_source).normalize(raw, text)
}
