//! Credential broker: `POST /analysis` for one-time upload credentials.

use serde::Serialize;
use vitalview_core::{PresignResponse, UploadCredentials, WorkflowError, DEFAULT_OUTPUT_FORMAT};

use crate::{error_text, ApiClient, ANALYSIS_PATH};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CredentialRequest<'a> {
    output_format: &'a str,
}

impl ApiClient {
    /// Request upload credentials scoped to `output_format` (`"json"` when empty).
    ///
    /// Never retries: an unauthorized request will not succeed on a second
    /// attempt, and outages are the caller's concern.
    #[tracing::instrument(skip(self, auth_token), fields(operation = "request_credentials"))]
    pub async fn request_credentials(
        &self,
        auth_token: &str,
        output_format: &str,
    ) -> Result<UploadCredentials, WorkflowError> {
        if auth_token.trim().is_empty() {
            return Err(WorkflowError::Credential {
                status: None,
                message: "Missing bearer token".to_string(),
            });
        }

        let output_format = if output_format.is_empty() {
            DEFAULT_OUTPUT_FORMAT
        } else {
            output_format
        };

        let url = self.build_url(ANALYSIS_PATH);
        let request = self
            .with_bearer(self.client.post(&url), auth_token)
            .json(&CredentialRequest { output_format });

        let response = request
            .send()
            .await
            .map_err(|e| WorkflowError::Credential {
                status: e.status().map(|s| s.as_u16()),
                message: format!("Failed to send request: {}", e),
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = error_text(response).await;
            tracing::warn!(status = status.as_u16(), "Credential request rejected");
            return Err(WorkflowError::Credential {
                status: Some(status.as_u16()),
                message,
            });
        }

        let presign: PresignResponse = response.json().await.map_err(|e| {
            WorkflowError::Configuration(format!("Failed to parse presign response: {}", e))
        })?;

        let credentials = UploadCredentials::from_presign(presign)?;
        tracing::debug!(
            destination = %credentials.destination(),
            fields = credentials.fields().len(),
            has_key = credentials.key().is_some(),
            "Upload credentials issued"
        );

        Ok(credentials)
    }
}
