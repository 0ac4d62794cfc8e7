//! Uploader: one multipart POST of the credential fields plus the file to the
//! storage destination.

use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::Body;
use std::path::Path;
use vitalview_core::{UploadCredentials, WorkflowError};

use crate::{error_text, ApiClient};

/// Form field the storage endpoint expects the file under.
pub const FILE_FIELD: &str = "file";

/// File selected for analysis, held in memory so the upload length is known.
#[derive(Debug, Clone)]
pub struct UploadFile {
    file_name: String,
    content_type: Option<String>,
    bytes: Bytes,
}

impl UploadFile {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: None,
            bytes: bytes.into(),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Read a local file.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, WorkflowError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            WorkflowError::InvalidInput(format!("Failed to read file {}: {}", path.display(), e))
        })?;

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("recording.001")
            .to_string();

        Ok(Self::new(file_name, bytes))
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }
}

impl ApiClient {
    /// Upload `file` to the credential's destination.
    ///
    /// Issues exactly one request. Any success status counts as success and the
    /// response body is never parsed. No retry: credentials may be single-use.
    #[tracing::instrument(
        skip(self, file, credentials),
        fields(
            file_name = %file.file_name(),
            size = file.len(),
            operation = "upload"
        )
    )]
    pub async fn upload(
        &self,
        file: &UploadFile,
        credentials: &UploadCredentials,
    ) -> Result<(), WorkflowError> {
        let mut form = Form::new();
        for (name, value) in credentials.fields() {
            form = form.text(name.clone(), value.clone());
        }

        let part = Part::stream_with_length(Body::from(file.bytes.clone()), file.len() as u64)
            .file_name(file.file_name.clone());
        let part = match file.content_type() {
            Some(content_type) => part.mime_str(content_type).map_err(|e| {
                WorkflowError::InvalidInput(format!(
                    "Invalid content type '{}': {}",
                    content_type, e
                ))
            })?,
            None => part,
        };
        // Storage endpoints require the file after every policy field.
        form = form.part(FILE_FIELD, part);

        let response = self
            .client
            .post(credentials.destination().clone())
            .multipart(form)
            .send()
            .await
            .map_err(|e| WorkflowError::Upload {
                status: e.status().map(|s| s.as_u16()),
                message: format!("Failed to send upload: {}", e),
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = error_text(response).await;
            tracing::warn!(status = status.as_u16(), "Storage rejected upload");
            return Err(WorkflowError::Upload {
                status: Some(status.as_u16()),
                message,
            });
        }

        tracing::debug!(status = status.as_u16(), "File uploaded");
        Ok(())
    }
}
