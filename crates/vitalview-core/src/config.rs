//! Configuration module
//!
//! Client configuration is read from the environment (optionally seeded from a
//! `.env` file). Every value has a default except the bearer token, which may
//! also be supplied per invocation.

use std::env;
use std::time::Duration;

use crate::error::WorkflowError;
use crate::models::{RetryBudget, DEFAULT_MAX_RETRIES, DEFAULT_POLL_DELAY_MS};

const DEFAULT_API_URL: &str = "https://analysis-manager-glymphaticresearch.2.rahtiapp.fi";
const HTTP_TIMEOUT_SECS: u64 = 60;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the analysis backend (without the `/analysis` path)
    pub api_base_url: String,
    pub auth_token: Option<String>,
    pub max_retries: u32,
    pub poll_delay_ms: u64,
    pub http_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.to_string(),
            auth_token: None,
            max_retries: DEFAULT_MAX_RETRIES,
            poll_delay_ms: DEFAULT_POLL_DELAY_MS,
            http_timeout_secs: HTTP_TIMEOUT_SECS,
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let config = Self {
            api_base_url: var("VITALVIEW_ANALYSIS_API_URL")
                .unwrap_or(defaults.api_base_url)
                .trim_end_matches('/')
                .to_string(),
            auth_token: var("VITALVIEW_TOKEN"),
            max_retries: match var("ANALYSIS_MAX_RETRIES") {
                Some(raw) => raw
                    .parse()
                    .map_err(|_| anyhow::anyhow!("ANALYSIS_MAX_RETRIES must be a valid number"))?,
                None => defaults.max_retries,
            },
            poll_delay_ms: match var("ANALYSIS_POLL_DELAY_MS") {
                Some(raw) => raw
                    .parse()
                    .map_err(|_| anyhow::anyhow!("ANALYSIS_POLL_DELAY_MS must be a valid number"))?,
                None => defaults.poll_delay_ms,
            },
            http_timeout_secs: match var("HTTP_TIMEOUT_SECS") {
                Some(raw) => raw
                    .parse()
                    .map_err(|_| anyhow::anyhow!("HTTP_TIMEOUT_SECS must be a valid number"))?,
                None => defaults.http_timeout_secs,
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !(self.api_base_url.starts_with("http://") || self.api_base_url.starts_with("https://"))
        {
            return Err(anyhow::anyhow!(
                "VITALVIEW_ANALYSIS_API_URL must be an http(s) URL"
            ));
        }

        if self.max_retries == 0 {
            return Err(anyhow::anyhow!(
                "ANALYSIS_MAX_RETRIES must be at least 1"
            ));
        }

        if self.http_timeout_secs == 0 {
            return Err(anyhow::anyhow!("HTTP_TIMEOUT_SECS must be greater than 0"));
        }

        Ok(())
    }

    pub fn retry_budget(&self) -> Result<RetryBudget, WorkflowError> {
        RetryBudget::from_millis(self.max_retries, self.poll_delay_ms)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}
