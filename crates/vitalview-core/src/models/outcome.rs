use serde_json::Value;
use url::Url;

use crate::error::WorkflowError;

/// Result of a single poll of the result endpoint.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisOutcome {
    /// The backend has not produced a result for the key yet.
    Pending,
    /// Terminal success; the payload lives at the given location.
    Indirect(Url),
    /// Terminal success; the payload is the response body itself.
    Inline(Value),
}

impl AnalysisOutcome {
    /// Decode a successful result-endpoint body.
    ///
    /// An object carrying a string `url` is an indirection; anything else is
    /// the payload.
    pub fn from_success_body(body: Value) -> Result<Self, WorkflowError> {
        if let Some(raw) = body.get("url").and_then(Value::as_str) {
            let url = Url::parse(raw).map_err(|e| {
                WorkflowError::Configuration(format!("Invalid result url '{}': {}", raw, e))
            })?;
            return Ok(AnalysisOutcome::Indirect(url));
        }
        Ok(AnalysisOutcome::Inline(body))
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, AnalysisOutcome::Pending)
    }
}
