//! Error types module
//!
//! Every failure of the analysis workflow is represented by [`WorkflowError`].
//! Each variant describes itself through [`ErrorMetadata`] so callers (the CLI,
//! a UI layer) can pick a user-facing message and log level without matching
//! on variants themselves.

use std::fmt::Write as _;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected outcomes like a cancelled invocation
    Debug,
    /// Warning level - for failures the user can resolve by retrying
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata describing how an error should be presented to the end user.
pub trait ErrorMetadata {
    /// Machine-readable error code (e.g., "UPLOAD_ERROR")
    fn error_code(&self) -> &'static str;

    /// Whether re-running the whole workflow may succeed
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the user
    fn suggested_action(&self) -> Option<&'static str>;

    /// User-facing message (may differ from the internal error message)
    fn client_message(&self) -> String;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

/// Failure of one workflow invocation.
///
/// Status codes are carried as plain `u16` so the type stays independent of
/// the HTTP client; `None` means the request never produced a response.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkflowError {
    #[error("Credential request failed{}: {message}", status_suffix(.status))]
    Credential {
        status: Option<u16>,
        message: String,
    },

    #[error("Upload failed{}: {message}", status_suffix(.status))]
    Upload {
        status: Option<u16>,
        message: String,
    },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Failed to fetch analysis{}: {message}", status_suffix(.status))]
    Poll {
        status: Option<u16>,
        message: String,
    },

    #[error("Analysis failed: {0}")]
    Analysis(String),

    #[error("Analysis timed out after {attempts} attempts")]
    Timeout { attempts: u32 },

    #[error("Analysis cancelled")]
    Cancelled,

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

fn status_suffix(status: &Option<u16>) -> String {
    let mut out = String::new();
    if let Some(code) = status {
        let _ = write!(out, " with status {}", code);
    }
    out
}

impl WorkflowError {
    /// Transport status attached to the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            WorkflowError::Credential { status, .. }
            | WorkflowError::Upload { status, .. }
            | WorkflowError::Poll { status, .. } => *status,
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, WorkflowError::Cancelled)
    }
}

/// Static metadata for each variant: (error_code, recoverable, suggested_action, log_level).
fn workflow_error_static_metadata(
    err: &WorkflowError,
) -> (&'static str, bool, Option<&'static str>, LogLevel) {
    match err {
        WorkflowError::Credential { status, .. } => match status {
            Some(401) | Some(403) => (
                "CREDENTIAL_REJECTED",
                false,
                Some("Sign in again and retry"),
                LogLevel::Warn,
            ),
            _ => (
                "CREDENTIAL_ERROR",
                true,
                Some("Retry after a short delay"),
                LogLevel::Error,
            ),
        },
        WorkflowError::Upload { .. } => (
            "UPLOAD_ERROR",
            true,
            Some("Retry the analysis"),
            LogLevel::Error,
        ),
        WorkflowError::Configuration(_) => (
            "CONFIGURATION_ERROR",
            false,
            Some("Contact support if this error persists"),
            LogLevel::Error,
        ),
        WorkflowError::Poll { .. } => (
            "POLL_ERROR",
            true,
            Some("Retry after a short delay"),
            LogLevel::Error,
        ),
        WorkflowError::Analysis(_) => (
            "ANALYSIS_FAILED",
            false,
            Some("Check the recording and try a different file"),
            LogLevel::Warn,
        ),
        WorkflowError::Timeout { .. } => (
            "ANALYSIS_TIMEOUT",
            true,
            Some("Retry later or increase the retry budget"),
            LogLevel::Warn,
        ),
        WorkflowError::Cancelled => ("CANCELLED", true, None, LogLevel::Debug),
        WorkflowError::InvalidInput(_) => (
            "INVALID_INPUT",
            false,
            Some("Check the selected file and parameters"),
            LogLevel::Debug,
        ),
    }
}

impl ErrorMetadata for WorkflowError {
    fn error_code(&self) -> &'static str {
        workflow_error_static_metadata(self).0
    }

    fn is_recoverable(&self) -> bool {
        workflow_error_static_metadata(self).1
    }

    fn suggested_action(&self) -> Option<&'static str> {
        workflow_error_static_metadata(self).2
    }

    fn client_message(&self) -> String {
        match self {
            WorkflowError::Credential { status, .. } => match status {
                Some(401) | Some(403) => {
                    "You are not authorized to start an analysis. Please sign in again.".to_string()
                }
                Some(code) if (400..500).contains(code) => {
                    format!("The analysis service rejected the request (status {}).", code)
                }
                _ => "The analysis service is unavailable. Please try again later.".to_string(),
            },
            WorkflowError::Upload { .. } => {
                "Uploading the file failed. Please try again.".to_string()
            }
            WorkflowError::Configuration(_) => {
                "The analysis service returned an unexpected response.".to_string()
            }
            WorkflowError::Poll { status, .. } => match status {
                Some(code) => format!("Failed to fetch the analysis result (status {}).", code),
                None => "Failed to reach the analysis service.".to_string(),
            },
            WorkflowError::Analysis(message) => format!("Analysis failed: {}", message),
            WorkflowError::Timeout { attempts } => format!(
                "The analysis did not finish after {} attempts. You can retry the upload.",
                attempts
            ),
            WorkflowError::Cancelled => "The analysis was cancelled.".to_string(),
            WorkflowError::InvalidInput(message) => message.clone(),
        }
    }

    fn log_level(&self) -> LogLevel {
        workflow_error_static_metadata(self).3
    }
}

impl From<std::io::Error> for WorkflowError {
    fn from(err: std::io::Error) -> Self {
        WorkflowError::InvalidInput(format!("IO error: {}", err))
    }
}
