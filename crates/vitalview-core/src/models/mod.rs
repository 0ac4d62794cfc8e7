//! Data model shared by the workflow components.

pub mod credentials;
pub mod metric;
pub mod outcome;
pub mod payload;
pub mod retry;

pub use credentials::{PresignResponse, UploadCredentials};
pub use metric::{Metric, MetricId, Trend};
pub use outcome::AnalysisOutcome;
pub use payload::MetricPayload;
pub use retry::{RetryBudget, DEFAULT_MAX_RETRIES, DEFAULT_POLL_DELAY_MS};

/// Output format requested from the analysis backend.
pub const DEFAULT_OUTPUT_FORMAT: &str = "json";
