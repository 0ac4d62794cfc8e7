use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use url::Url;

use crate::error::WorkflowError;

/// Body of `POST /analysis` as returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresignResponse {
    /// Storage endpoint the file is posted to
    pub url: String,
    /// Opaque form fields echoed back to the storage endpoint
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
}

/// One-time upload credentials for a single workflow invocation.
///
/// The storage key is extracted once here so the rest of the workflow never
/// inspects `fields` again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadCredentials {
    destination: Url,
    fields: BTreeMap<String, String>,
    key: Option<String>,
}

impl UploadCredentials {
    pub fn new(destination: Url, fields: BTreeMap<String, String>) -> Self {
        let key = extract_key(&fields);
        Self {
            destination,
            fields,
            key,
        }
    }

    /// Decode the backend response. A destination that is not a URL is a
    /// backend contract violation.
    pub fn from_presign(response: PresignResponse) -> Result<Self, WorkflowError> {
        let destination = Url::parse(&response.url).map_err(|e| {
            WorkflowError::Configuration(format!(
                "Presign response has invalid upload url '{}': {}",
                response.url, e
            ))
        })?;
        Ok(Self::new(destination, response.fields))
    }

    pub fn destination(&self) -> &Url {
        &self.destination
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// The storage key, or a `Configuration` error when the backend omitted it.
    pub fn require_key(&self) -> Result<&str, WorkflowError> {
        self.key()
            .ok_or_else(|| WorkflowError::Configuration("Presign response missing key".to_string()))
    }
}

/// `key` wins over `Key`, which wins over any other casing. The first field
/// present is used even when empty; an empty key counts as missing.
fn extract_key(fields: &BTreeMap<String, String>) -> Option<String> {
    fields
        .get("key")
        .or_else(|| fields.get("Key"))
        .or_else(|| {
            fields
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case("key"))
                .map(|(_, value)| value)
        })
        .filter(|value| !value.is_empty())
        .cloned()
}
