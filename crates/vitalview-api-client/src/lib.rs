//! HTTP client for the VitalView analysis service.
//!
//! Provides a minimal reqwest-based client plus the four network operations of
//! the analysis workflow (credentials, upload, poll, indirect fetch), the
//! orchestrator that sequences them, and the result slot used by callers that
//! run several invocations against one display.

pub mod backend;
pub mod broker;
pub mod poller;
pub mod slot;
pub mod uploader;
pub mod workflow;

#[cfg(test)]
pub(crate) mod test_helpers;

use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder, Response};
use std::time::Duration;
use vitalview_core::ClientConfig;

/// Path of the credential and result endpoints below the API base URL.
pub const ANALYSIS_PATH: &str = "/analysis";

/// Longest error body kept in an error message. Storage endpoints answer with
/// XML documents that can be large.
const MAX_ERROR_BODY_LEN: usize = 512;

/// HTTP client for the analysis API.
///
/// Cheap to clone; clones share the underlying connection pool. The bearer
/// token is passed per call because the identity provider may refresh it
/// between invocations.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Self::new(config.api_base_url.clone(), config.http_timeout())
    }

    /// Create client from environment: VITALVIEW_ANALYSIS_API_URL, HTTP_TIMEOUT_SECS.
    pub fn from_env() -> Result<Self> {
        let config = ClientConfig::from_env().context("Invalid client configuration")?;
        Self::from_config(&config)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn with_bearer(&self, request: RequestBuilder, token: &str) -> RequestBuilder {
        request.header("Authorization", format!("Bearer {}", token))
    }

    /// Raw client for custom requests.
    pub fn client(&self) -> &Client {
        &self.client
    }
}

/// Read an error response body for diagnostics, bounded in length.
pub(crate) async fn error_text(response: Response) -> String {
    let text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    truncate(text.trim(), MAX_ERROR_BODY_LEN)
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

// Re-export the workflow surface for convenience.
pub use backend::AnalysisBackend;
pub use slot::{AnalysisSlot, Invocation, InvocationId, Published};
pub use uploader::{UploadFile, FILE_FIELD};
pub use workflow::{run_analysis, run_analysis_with_cancel, WorkflowStage};
