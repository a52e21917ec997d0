//! Checker configuration.
//!
//! Every field has a default, so an empty TOML file (or none at all) is a valid configuration:
//!
//! ```toml
//! preferred_source = "ai"
//! max_chars = 1000
//! accept_mode = "review"
//! offset_encoding = "utf16"
//! request_timeout_ms = 30000
//! case_sensitive_relocation = true
//! whole_word_relocation = false
//! ```

use crate::locate::LocateOptions;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// How accepting a suggestion edits the text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AcceptMode {
    /// Replace the erroneous text with the suggestion.
    #[default]
    Replace,
    /// Insert the suggestion after the erroneous text and flag the error as corrected; the
    /// original text is removed by a later commit.
    Review,
}

/// Unit of the offsets exchanged with the correction service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OffsetEncoding {
    /// UTF-16 code units (JavaScript string indices).
    #[default]
    Utf16,
    /// Unicode scalar values.
    Char,
}

/// Configuration load failure.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading the file failed.
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    /// The file is not valid TOML for [`CheckerConfig`].
    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Session-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckerConfig {
    /// Detector whose reports win overlaps.
    pub preferred_source: String,
    /// Longest text accepted for a check, in characters.
    pub max_chars: usize,
    /// Accept behaviour.
    pub accept_mode: AcceptMode,
    /// Offset unit used on the wire.
    pub offset_encoding: OffsetEncoding,
    /// Per-request timeout.
    pub request_timeout_ms: u64,
    /// Case-sensitive search when relocating stale errors.
    pub case_sensitive_relocation: bool,
    /// Only relocate onto whole-word occurrences.
    pub whole_word_relocation: bool,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            preferred_source: "ai".to_string(),
            max_chars: 1000,
            accept_mode: AcceptMode::Replace,
            offset_encoding: OffsetEncoding::Utf16,
            request_timeout_ms: 30_000,
            case_sensitive_relocation: true,
            whole_word_relocation: false,
        }
    }
}

impl CheckerConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(input)?)
    }

    /// Load a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Request timeout as a [`Duration`].
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Search options for the span locator.
    pub fn locate_options(&self) -> LocateOptions {
        LocateOptions {
            case_sensitive: self.case_sensitive_relocation,
            whole_word: self.whole_word_relocation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = CheckerConfig::from_toml_str("").unwrap();
        assert_eq!(config, CheckerConfig::default());
        assert_eq!(config.preferred_source, "ai");
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_partial_toml() {
        let config = CheckerConfig::from_toml_str(
            "accept_mode = \"review\"\noffset_encoding = \"char\"\nwhole_word_relocation = true\n",
        )
        .unwrap();
        assert_eq!(config.accept_mode, AcceptMode::Review);
        assert_eq!(config.offset_encoding, OffsetEncoding::Char);
        assert!(config.locate_options().whole_word);
        assert_eq!(config.max_chars, 1000);
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            CheckerConfig::from_toml_str("accept_mode = \"sometimes\""),
            Err(ConfigError::Toml(_))
        ));
    }
}
