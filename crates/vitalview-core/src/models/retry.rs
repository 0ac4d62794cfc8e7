use std::num::NonZeroU32;
use std::time::Duration;

use crate::error::WorkflowError;

pub const DEFAULT_MAX_RETRIES: u32 = 10;
pub const DEFAULT_POLL_DELAY_MS: u64 = 3000;

/// How long a workflow invocation keeps polling for a pending result.
///
/// Worst-case wait is bounded by `max_attempts * delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBudget {
    max_attempts: NonZeroU32,
    delay: Duration,
}

impl RetryBudget {
    pub fn new(max_attempts: u32, delay: Duration) -> Result<Self, WorkflowError> {
        let max_attempts = NonZeroU32::new(max_attempts).ok_or_else(|| {
            WorkflowError::InvalidInput("Retry budget needs at least one attempt".to_string())
        })?;
        Ok(Self {
            max_attempts,
            delay,
        })
    }

    pub fn from_millis(max_attempts: u32, delay_ms: u64) -> Result<Self, WorkflowError> {
        Self::new(max_attempts, Duration::from_millis(delay_ms))
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts.get()
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn worst_case_wait(&self) -> Duration {
        self.delay.saturating_mul(self.max_attempts.get())
    }
}

impl Default for RetryBudget {
    fn default() -> Self {
        Self {
            max_attempts: NonZeroU32::new(DEFAULT_MAX_RETRIES).unwrap_or(NonZeroU32::MIN),
            delay: Duration::from_millis(DEFAULT_POLL_DELAY_MS),
        }
    }
}
