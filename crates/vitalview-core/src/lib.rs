//! VitalView Core Library
//!
//! This crate provides the domain models, error taxonomy, configuration and
//! metric series helpers shared by the VitalView analysis client and CLI.

pub mod config;
pub mod error;
pub mod models;
pub mod series;

// Re-export commonly used types
pub use config::ClientConfig;
pub use error::{ErrorMetadata, LogLevel, WorkflowError};
pub use models::{
    AnalysisOutcome, Metric, MetricId, MetricPayload, PresignResponse, RetryBudget,
    UploadCredentials, DEFAULT_OUTPUT_FORMAT,
};
pub use series::{
    extract_series, summarize_metric, summarize_payload, trend_entries, MetricSeries, MetricSummary,
    TrendEntry,
};
