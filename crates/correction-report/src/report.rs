//! Response body parsing.
//!
//! A response body looks like:
//!
//! ```json
//! {
//!   "errors": [
//!     { "word": "pra", "start": 8, "end": 11, "type": "spelling", "source": "ai",
//!       "suggestions": ["para"], "explanation": "Informal contraction." }
//!   ],
//!   "logId": 1234
//! }
//! ```
//!
//! Entries that do not parse are skipped one by one; the rest of the report is still used.
//! A failed request may instead carry `{ "error": { "description": "..." } }`.

use crate::encoding::convert_offsets;
use correction_core::{OffsetEncoding, TextError};
use serde_json::Value;
use thiserror::Error;

/// A response body that cannot be used at all.
#[derive(Debug, Error)]
pub enum ReportParseError {
    /// The body is not JSON.
    #[error("invalid response JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    /// The body has no `errors` array.
    #[error("response has no `errors` array")]
    MissingErrors,
    /// The service reported a failure.
    #[error("service error: {0}")]
    Service(String),
}

/// A parsed report with offsets in characters of the submitted text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckResponse {
    /// Reported errors, in service order.
    pub errors: Vec<TextError>,
    /// Service log identifier, if sent.
    pub log_id: Option<String>,
}

impl CheckResponse {
    /// Build a response from errors carrying wire offsets.
    pub fn from_wire(
        mut errors: Vec<TextError>,
        log_id: Option<String>,
        submitted_text: &str,
        encoding: OffsetEncoding,
    ) -> Self {
        convert_offsets(submitted_text, &mut errors, encoding);
        Self { errors, log_id }
    }
}

/// Parse a complete response body for `submitted_text`.
pub fn parse_response(
    body: &str,
    submitted_text: &str,
    encoding: OffsetEncoding,
) -> Result<CheckResponse, ReportParseError> {
    let value: Value = serde_json::from_str(body.trim())?;

    if let Some(description) = service_error(&value) {
        return Err(ReportParseError::Service(description));
    }

    let entries = value
        .get("errors")
        .and_then(Value::as_array)
        .ok_or(ReportParseError::MissingErrors)?;

    Ok(CheckResponse::from_wire(
        parse_entries(entries),
        log_id(&value),
        submitted_text,
        encoding,
    ))
}

/// Parse error entries, skipping malformed ones.
pub fn parse_entries(entries: &[Value]) -> Vec<TextError> {
    entries
        .iter()
        .enumerate()
        .filter_map(|(idx, entry)| match serde_json::from_value::<TextError>(entry.clone()) {
            Ok(error) => Some(error),
            Err(err) => {
                tracing::debug!(idx, %err, "skipping malformed error entry");
                None
            }
        })
        .collect()
}

/// `logId` as a string; the service sends either a string or a number.
pub(crate) fn log_id(value: &Value) -> Option<String> {
    match value.get("logId")? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn service_error(value: &Value) -> Option<String> {
    let error = value.get("error")?;
    let description = error
        .get("description")
        .and_then(Value::as_str)
        .or_else(|| error.as_str())
        .unwrap_or("An error occurred");
    Some(description.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use correction_core::ErrorKind;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_full_response() {
        let body = r#"{
            "errors": [
                {"word":"pra","start":8,"end":11,"type":"spelling","source":"ai","suggestions":["para"]},
                {"word":"escola","start":12,"end":18,"type":"grammar","source":"lt","suggestions":[],"explanation":null}
            ],
            "logId": 42
        }"#;
        let response = parse_response(body, "Ele foi pra escola", OffsetEncoding::Utf16).unwrap();
        assert_eq!(response.log_id.as_deref(), Some("42"));
        assert_eq!(
            response.errors[0],
            TextError::new("pra", 8, 11, ErrorKind::Spelling, "ai").with_suggestions(["para"])
        );
        assert_eq!(response.errors[1].kind, ErrorKind::Grammar);
        assert_eq!(response.errors[1].explanation, None);
    }

    #[test]
    fn test_bad_entries_are_skipped() {
        let body = r#"{"errors": [
            {"word":"pra","start":8,"end":11,"type":"typo","source":"ai"},
            {"word":"pra","start":"8","end":11,"type":"spelling","source":"ai"},
            42,
            {"word":"pra","start":8,"end":11,"type":"spelling","source":"ai"}
        ]}"#;
        let response = parse_response(body, "Ele foi pra escola", OffsetEncoding::Char).unwrap();
        assert_eq!(response.errors.len(), 1);
        assert!(response.errors[0].suggestions.is_empty());
        assert_eq!(response.log_id, None);
    }

    #[test]
    fn test_unusable_bodies() {
        assert!(matches!(
            parse_response("not json", "", OffsetEncoding::Char),
            Err(ReportParseError::InvalidJson(_))
        ));
        assert!(matches!(
            parse_response(r#"{"result": []}"#, "", OffsetEncoding::Char),
            Err(ReportParseError::MissingErrors)
        ));
        assert!(matches!(
            parse_response(r#"{"error": {"description": "quota exceeded"}}"#, "", OffsetEncoding::Char),
            Err(ReportParseError::Service(msg)) if msg == "quota exceeded"
        ));
    }
}
