//! Request body sent to the correction service.

use serde::{Deserialize, Serialize};

/// JSON body of a check request.
///
/// ```rust
/// use correction_report::CheckRequest;
///
/// let request = CheckRequest::new("Ele foi pra escola").with_tag("development");
/// assert_eq!(
///     request.to_json().unwrap(),
///     r#"{"text":"Ele foi pra escola","tag":"development"}"#
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckRequest {
    /// Text to check.
    pub text: String,
    /// Calling project identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    /// Deployment tag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    /// Language of the text (e.g. `pt-BR`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang_code: Option<String>,
}

impl CheckRequest {
    /// Create a request for `text`.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Set the project identifier.
    pub fn with_project_id(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    /// Set the deployment tag.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Set the language code.
    pub fn with_lang_code(mut self, lang_code: impl Into<String>) -> Self {
        self.lang_code = Some(lang_code.into());
        self
    }

    /// Serialize to a JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
