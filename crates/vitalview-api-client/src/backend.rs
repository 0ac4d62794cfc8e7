//! Backend abstraction trait
//!
//! The orchestrator depends on this trait rather than on [`ApiClient`] so the
//! same workflow runs against the live service and against scripted backends.

use async_trait::async_trait;
use reqwest::Url;
use serde_json::Value;
use vitalview_core::{AnalysisOutcome, UploadCredentials, WorkflowError};

use crate::uploader::UploadFile;
use crate::ApiClient;

/// The four network operations of one analysis workflow.
#[async_trait]
pub trait AnalysisBackend: Send + Sync {
    /// Issue one-time upload credentials scoped to `output_format`.
    async fn request_credentials(
        &self,
        auth_token: &str,
        output_format: &str,
    ) -> Result<UploadCredentials, WorkflowError>;

    /// Transfer the file to the credential's destination, once.
    async fn upload(
        &self,
        file: &UploadFile,
        credentials: &UploadCredentials,
    ) -> Result<(), WorkflowError>;

    /// Query the result endpoint once.
    async fn poll_once(&self, key: &str, auth_token: &str)
        -> Result<AnalysisOutcome, WorkflowError>;

    /// Dereference an indirect result.
    async fn fetch_indirect(&self, result_url: &Url) -> Result<Value, WorkflowError>;
}

#[async_trait]
impl AnalysisBackend for ApiClient {
    async fn request_credentials(
        &self,
        auth_token: &str,
        output_format: &str,
    ) -> Result<UploadCredentials, WorkflowError> {
        ApiClient::request_credentials(self, auth_token, output_format).await
    }

    async fn upload(
        &self,
        file: &UploadFile,
        credentials: &UploadCredentials,
    ) -> Result<(), WorkflowError> {
        ApiClient::upload(self, file, credentials).await
    }

    async fn poll_once(
        &self,
        key: &str,
        auth_token: &str,
    ) -> Result<AnalysisOutcome, WorkflowError> {
        ApiClient::poll_once(self, key, auth_token).await
    }

    async fn fetch_indirect(&self, result_url: &Url) -> Result<Value, WorkflowError> {
        ApiClient::fetch_indirect(self, result_url).await
    }
}
