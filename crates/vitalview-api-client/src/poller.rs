//! Result poller: one query of `GET /analysis/{key}` per call, plus the single
//! dereference of an indirect result.

use reqwest::{StatusCode, Url};
use serde_json::Value;
use vitalview_core::{AnalysisOutcome, WorkflowError, DEFAULT_OUTPUT_FORMAT};

use crate::{error_text, ApiClient, ANALYSIS_PATH};

impl ApiClient {
    /// Query the result endpoint once.
    ///
    /// 404 means the backend is still processing and maps to
    /// [`AnalysisOutcome::Pending`]. Every other non-success status is a
    /// `Poll` error; rate limiting included.
    pub async fn poll_once(
        &self,
        key: &str,
        auth_token: &str,
    ) -> Result<AnalysisOutcome, WorkflowError> {
        let url = self.build_url(&format!("{}/{}", ANALYSIS_PATH, urlencoding::encode(key)));
        let request = self
            .with_bearer(self.client.get(&url), auth_token)
            .query(&[("outputFormat", DEFAULT_OUTPUT_FORMAT)]);

        let response = request.send().await.map_err(|e| WorkflowError::Poll {
            status: e.status().map(|s| s.as_u16()),
            message: format!("Failed to send request: {}", e),
        })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            tracing::debug!(key = %key, "Analysis result not ready yet");
            return Ok(AnalysisOutcome::Pending);
        }

        if !status.is_success() {
            let message = error_text(response).await;
            return Err(WorkflowError::Poll {
                status: Some(status.as_u16()),
                message,
            });
        }

        let body: Value = response.json().await.map_err(|e| WorkflowError::Poll {
            status: Some(status.as_u16()),
            message: format!("Failed to parse analysis response: {}", e),
        })?;

        AnalysisOutcome::from_success_body(body)
    }

    /// Fetch the payload an indirect result points to. Sent without the
    /// bearer token: the location is typically a presigned storage URL.
    pub async fn fetch_indirect(&self, result_url: &Url) -> Result<Value, WorkflowError> {
        let response = self
            .client
            .get(result_url.clone())
            .send()
            .await
            .map_err(|e| WorkflowError::Poll {
                status: e.status().map(|s| s.as_u16()),
                message: format!("Failed to fetch analysis result: {}", e),
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = error_text(response).await;
            return Err(WorkflowError::Poll {
                status: Some(status.as_u16()),
                message,
            });
        }

        response.json().await.map_err(|e| WorkflowError::Poll {
            status: Some(status.as_u16()),
            message: format!("Failed to parse analysis result: {}", e),
        })
    }
}
