//! Analysis workflow orchestration
//!
//! One invocation runs credentials → upload → bounded polling → optional
//! dereference → validation, strictly in that order. Nothing is retried
//! except polling while the result is pending.

use std::fmt;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use vitalview_core::{
    AnalysisOutcome, ErrorMetadata, LogLevel, MetricPayload, RetryBudget, WorkflowError,
    DEFAULT_OUTPUT_FORMAT,
};

use crate::backend::AnalysisBackend;
use crate::uploader::UploadFile;

/// Lifecycle of one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowStage {
    Idle,
    Uploading,
    Polling,
    Succeeded,
    Failed,
    TimedOut,
    Cancelled,
}

impl WorkflowStage {
    pub fn as_str(self) -> &'static str {
        match self {
            WorkflowStage::Idle => "idle",
            WorkflowStage::Uploading => "uploading",
            WorkflowStage::Polling => "polling",
            WorkflowStage::Succeeded => "succeeded",
            WorkflowStage::Failed => "failed",
            WorkflowStage::TimedOut => "timed_out",
            WorkflowStage::Cancelled => "cancelled",
        }
    }

    /// Terminal stage reached by a finished invocation.
    pub fn of_result<T>(result: &Result<T, WorkflowError>) -> Self {
        match result {
            Ok(_) => WorkflowStage::Succeeded,
            Err(WorkflowError::Timeout { .. }) => WorkflowStage::TimedOut,
            Err(WorkflowError::Cancelled) => WorkflowStage::Cancelled,
            Err(_) => WorkflowStage::Failed,
        }
    }
}

impl fmt::Display for WorkflowStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Run one analysis invocation to completion.
pub async fn run_analysis<B>(
    backend: &B,
    file: &UploadFile,
    auth_token: &str,
    budget: RetryBudget,
) -> Result<MetricPayload, WorkflowError>
where
    B: AnalysisBackend + ?Sized,
{
    run_analysis_with_cancel(backend, file, auth_token, budget, &CancellationToken::new()).await
}

/// Run one analysis invocation, abandoning it once `cancel` fires.
///
/// Cancellation is observed between steps and during the delay between
/// polls. A request already in flight is allowed to finish but its result is
/// discarded.
pub async fn run_analysis_with_cancel<B>(
    backend: &B,
    file: &UploadFile,
    auth_token: &str,
    budget: RetryBudget,
    cancel: &CancellationToken,
) -> Result<MetricPayload, WorkflowError>
where
    B: AnalysisBackend + ?Sized,
{
    tracing::debug!(
        stage = %WorkflowStage::Idle,
        file_name = %file.file_name(),
        size = file.len(),
        max_attempts = budget.max_attempts(),
        delay_ms = budget.delay().as_millis() as u64,
        "Starting analysis workflow"
    );

    let result = execute(backend, file, auth_token, budget, cancel).await;
    let stage = WorkflowStage::of_result(&result);

    match &result {
        Ok(_) => tracing::info!(
            stage = %stage,
            file_name = %file.file_name(),
            "Analysis workflow finished"
        ),
        Err(err) => log_failure(err, stage),
    }

    result
}

async fn execute<B>(
    backend: &B,
    file: &UploadFile,
    auth_token: &str,
    budget: RetryBudget,
    cancel: &CancellationToken,
) -> Result<MetricPayload, WorkflowError>
where
    B: AnalysisBackend + ?Sized,
{
    ensure_active(cancel)?;
    tracing::info!(
        stage = %WorkflowStage::Uploading,
        file_name = %file.file_name(),
        "Requesting upload credentials"
    );
    let credentials = backend
        .request_credentials(auth_token, DEFAULT_OUTPUT_FORMAT)
        .await?;

    ensure_active(cancel)?;
    backend.upload(file, &credentials).await?;

    let key = credentials.require_key()?;
    tracing::info!(
        stage = %WorkflowStage::Polling,
        key = %key,
        max_attempts = budget.max_attempts(),
        "File uploaded, waiting for analysis"
    );

    let max_attempts = budget.max_attempts();
    for attempt in 1..=max_attempts {
        ensure_active(cancel)?;
        let outcome = backend.poll_once(key, auth_token).await?;
        ensure_active(cancel)?;

        match outcome {
            AnalysisOutcome::Pending => {
                tracing::debug!(attempt, max_attempts, "Analysis pending");
                if attempt < max_attempts {
                    tokio::select! {
                        _ = cancel.cancelled() => return Err(WorkflowError::Cancelled),
                        _ = sleep(budget.delay()) => {}
                    }
                }
            }
            AnalysisOutcome::Indirect(result_url) => {
                tracing::debug!(attempt, result_url = %result_url, "Fetching analysis result");
                let body = backend.fetch_indirect(&result_url).await?;
                ensure_active(cancel)?;
                return MetricPayload::from_value(body)?.validate();
            }
            AnalysisOutcome::Inline(body) => {
                tracing::debug!(attempt, "Analysis result returned inline");
                return MetricPayload::from_value(body)?.validate();
            }
        }
    }

    Err(WorkflowError::Timeout {
        attempts: max_attempts,
    })
}

fn ensure_active(cancel: &CancellationToken) -> Result<(), WorkflowError> {
    if cancel.is_cancelled() {
        Err(WorkflowError::Cancelled)
    } else {
        Ok(())
    }
}

fn log_failure(err: &WorkflowError, stage: WorkflowStage) {
    match err.log_level() {
        LogLevel::Debug => tracing::debug!(
            stage = %stage,
            error_code = err.error_code(),
            error = %err,
            "Analysis workflow stopped"
        ),
        LogLevel::Warn => tracing::warn!(
            stage = %stage,
            error_code = err.error_code(),
            status = ?err.status(),
            error = %err,
            "Analysis workflow failed"
        ),
        LogLevel::Error => tracing::error!(
            stage = %stage,
            error_code = err.error_code(),
            status = ?err.status(),
            error = %err,
            "Analysis workflow failed"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use serde_json::json;
    use std::time::Duration;
    use tokio::time::Instant;

    const DELAY: Duration = Duration::from_millis(3000);

    fn budget(max_attempts: u32) -> RetryBudget {
        RetryBudget::new(max_attempts, DELAY).unwrap()
    }

    fn assert_elapsed(start: Instant, expected: Duration) {
        let elapsed = start.elapsed();
        assert!(
            elapsed >= expected && elapsed < expected + Duration::from_millis(50),
            "expected ~{:?} of waiting, got {:?}",
            expected,
            elapsed
        );
    }

    #[tokio::test(start_paused = true)]
    async fn missing_key_fails_before_any_poll() {
        let backend = ScriptedBackend::new()
            .with_credentials(Ok(credentials_with_fields(&[("policy", "p")])));

        let err = run_analysis(&backend, &sample_file(), TOKEN, budget(5))
            .await
            .unwrap_err();

        assert!(matches!(err, WorkflowError::Configuration(_)));
        assert_eq!(backend.upload_count(), 1);
        assert_eq!(backend.poll_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn pending_then_inline_success() {
        let payload = json!({ "errors": [], "heartrate": { "measurements": [] } });
        let backend = ScriptedBackend::new().with_polls(pending_then(
            3,
            Ok(AnalysisOutcome::Inline(payload.clone())),
        ));

        let start = Instant::now();
        let result = run_analysis(&backend, &sample_file(), TOKEN, budget(10))
            .await
            .unwrap();

        assert_eq!(result.into_value(), payload);
        assert_eq!(backend.poll_count(), 4);
        assert_elapsed(start, DELAY * 3);
        assert_eq!(
            backend.calls()[..2],
            [
                Call::Credentials("json".to_string()),
                Call::Upload("rec.001".to_string()),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn success_on_first_poll_never_sleeps() {
        let backend = ScriptedBackend::new()
            .with_polls(vec![Ok(AnalysisOutcome::Inline(json!({ "errors": [] })))]);

        let start = Instant::now();
        run_analysis(&backend, &sample_file(), TOKEN, budget(3))
            .await
            .unwrap();

        assert_eq!(backend.poll_count(), 1);
        assert_elapsed(start, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_budget_times_out() {
        let backend = ScriptedBackend::new();

        let start = Instant::now();
        let err = run_analysis(&backend, &sample_file(), TOKEN, budget(4))
            .await
            .unwrap_err();

        assert_eq!(err, WorkflowError::Timeout { attempts: 4 });
        assert!(err.to_string().contains('4'));
        assert_eq!(backend.poll_count(), 4);
        assert_elapsed(start, DELAY * 3);
    }

    #[tokio::test(start_paused = true)]
    async fn backend_errors_fail_despite_success_status() {
        let backend = ScriptedBackend::new().with_polls(vec![Ok(AnalysisOutcome::Inline(
            json!({ "errors": ["ECG lead off", "too short"] }),
        ))]);

        let err = run_analysis(&backend, &sample_file(), TOKEN, budget(3))
            .await
            .unwrap_err();

        match err {
            WorkflowError::Analysis(message) => {
                assert!(message.contains("ECG lead off"));
                assert!(message.contains("too short"));
            }
            other => panic!("expected analysis error, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn nested_result_error_carries_message() {
        let backend = ScriptedBackend::new().with_polls(vec![Ok(AnalysisOutcome::Inline(
            json!({ "errors": [], "result": { "error": "recording is empty" } }),
        ))]);

        let err = run_analysis(&backend, &sample_file(), TOKEN, budget(3))
            .await
            .unwrap_err();

        assert_eq!(err, WorkflowError::Analysis("recording is empty".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn indirect_result_is_fetched_once() {
        let body = json!({ "errors": [], "gIndex": { "measurements": [] } });
        let backend = ScriptedBackend::new()
            .with_polls(pending_then(1, Ok(indirect("https://x/y"))))
            .with_indirect(Ok(body.clone()));

        let result = run_analysis(&backend, &sample_file(), TOKEN, budget(5))
            .await
            .unwrap();

        assert_eq!(result.into_value(), body);
        assert_eq!(backend.poll_count(), 2);
        assert_eq!(backend.indirect_calls(), vec!["https://x/y".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn indirect_payload_is_validated() {
        let backend = ScriptedBackend::new()
            .with_polls(vec![Ok(indirect("https://x/y"))])
            .with_indirect(Ok(json!({ "errors": [], "result": { "error": "bad file" } })));

        let err = run_analysis(&backend, &sample_file(), TOKEN, budget(5))
            .await
            .unwrap_err();

        assert_eq!(err, WorkflowError::Analysis("bad file".to_string()));
        assert_eq!(backend.poll_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn upload_failure_short_circuits() {
        let backend = ScriptedBackend::new().with_upload(Err(WorkflowError::Upload {
            status: Some(500),
            message: "InternalError".to_string(),
        }));

        let err = run_analysis(&backend, &sample_file(), TOKEN, budget(5))
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(500));
        assert!(matches!(err, WorkflowError::Upload { .. }));
        assert_eq!(backend.credential_count(), 1);
        assert_eq!(backend.poll_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn credential_failure_stops_before_upload() {
        let backend = ScriptedBackend::new().with_credentials(Err(WorkflowError::Credential {
            status: Some(401),
            message: "expired".to_string(),
        }));

        let err = run_analysis(&backend, &sample_file(), TOKEN, budget(5))
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(401));
        assert_eq!(backend.credential_count(), 1);
        assert_eq!(backend.upload_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn poll_error_aborts_remaining_attempts() {
        let backend = ScriptedBackend::new().with_polls(vec![
            Ok(AnalysisOutcome::Pending),
            Err(WorkflowError::Poll {
                status: Some(503),
                message: "unavailable".to_string(),
            }),
            Ok(AnalysisOutcome::Inline(json!({ "errors": [] }))),
        ]);

        let err = run_analysis(&backend, &sample_file(), TOKEN, budget(5))
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(503));
        assert_eq!(backend.poll_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_during_delay_stops_polling() {
        let backend = ScriptedBackend::new();
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(1000)).await;
            trigger.cancel();
        });

        let start = Instant::now();
        let err = run_analysis_with_cancel(&backend, &sample_file(), TOKEN, budget(10), &cancel)
            .await
            .unwrap_err();

        assert_eq!(err, WorkflowError::Cancelled);
        assert_eq!(backend.poll_count(), 1);
        assert_elapsed(start, Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_before_start_does_nothing() {
        let backend = ScriptedBackend::new();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = run_analysis_with_cancel(&backend, &sample_file(), TOKEN, budget(3), &cancel)
            .await
            .unwrap_err();

        assert_eq!(err, WorkflowError::Cancelled);
        assert!(backend.calls().is_empty());
    }

    #[test]
    fn stage_of_result() {
        let ok: Result<(), WorkflowError> = Ok(());
        assert_eq!(WorkflowStage::of_result(&ok), WorkflowStage::Succeeded);
        assert_eq!(
            WorkflowStage::of_result::<()>(&Err(WorkflowError::Timeout { attempts: 1 })),
            WorkflowStage::TimedOut
        );
        assert_eq!(
            WorkflowStage::of_result::<()>(&Err(WorkflowError::Cancelled)),
            WorkflowStage::Cancelled
        );
        assert_eq!(
            WorkflowStage::of_result::<()>(&Err(WorkflowError::Analysis("x".into()))),
            WorkflowStage::Failed
        );
        assert_eq!(WorkflowStage::TimedOut.to_string(), "timed_out");
    }
}
