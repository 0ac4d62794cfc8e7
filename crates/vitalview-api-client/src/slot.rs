//! Result slot shared by concurrent invocations.
//!
//! Several invocations may be in flight against one display (the user picks a
//! second file before the first finished). The slot numbers invocations in
//! start order and only ever shows the newest one's result: a slow earlier
//! invocation that finishes last cannot overwrite a later one.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use vitalview_core::{MetricPayload, RetryBudget, WorkflowError};

use crate::backend::AnalysisBackend;
use crate::uploader::UploadFile;
use crate::workflow::run_analysis_with_cancel;

/// Start-order number of an invocation. Larger means started later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InvocationId(u64);

impl InvocationId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for InvocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Handle for one started invocation.
#[derive(Debug, Clone)]
pub struct Invocation {
    id: InvocationId,
    cancel: CancellationToken,
}

impl Invocation {
    pub fn id(&self) -> InvocationId {
        self.id
    }

    pub fn token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Result currently shown by the slot.
#[derive(Debug, Clone, PartialEq)]
pub struct Published {
    pub invocation_id: InvocationId,
    pub result: Result<MetricPayload, WorkflowError>,
}

struct SlotState {
    shown: u64,
    cancel: CancellationToken,
}

pub struct AnalysisSlot {
    next_id: AtomicU64,
    state: Mutex<SlotState>,
    tx: watch::Sender<Option<Arc<Published>>>,
}

impl AnalysisSlot {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            next_id: AtomicU64::new(1),
            state: Mutex::new(SlotState {
                shown: 0,
                cancel: CancellationToken::new(),
            }),
            tx,
        }
    }

    /// Start a new invocation. Its token is cancelled by the next
    /// [`cancel_in_flight`](Self::cancel_in_flight) or
    /// [`supersede`](Self::supersede).
    pub fn begin(&self) -> Invocation {
        let state = self.lock();
        let id = InvocationId(self.next_id.fetch_add(1, Ordering::SeqCst));
        Invocation {
            id,
            cancel: state.cancel.child_token(),
        }
    }

    /// Cancel everything in flight and start a new invocation.
    pub fn supersede(&self) -> Invocation {
        self.cancel_in_flight();
        self.begin()
    }

    /// Cancel every invocation started so far. Later ones are unaffected.
    pub fn cancel_in_flight(&self) {
        let mut state = self.lock();
        state.cancel.cancel();
        state.cancel = CancellationToken::new();
    }

    /// Show `result` unless the invocation was cancelled or a later
    /// invocation has already published. Returns whether it was written.
    pub fn publish(
        &self,
        invocation: &Invocation,
        result: Result<MetricPayload, WorkflowError>,
    ) -> bool {
        let mut state = self.lock();
        let id = invocation.id.0;
        if invocation.is_cancelled() || id <= state.shown {
            tracing::debug!(
                invocation = %invocation.id,
                shown = state.shown,
                cancelled = invocation.is_cancelled(),
                "Discarding stale analysis result"
            );
            return false;
        }

        state.shown = id;
        self.tx.send_replace(Some(Arc::new(Published {
            invocation_id: invocation.id,
            result,
        })));
        true
    }

    pub fn current(&self) -> Option<Arc<Published>> {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<Published>>> {
        self.tx.subscribe()
    }

    /// Start an invocation, run it and publish its result.
    pub async fn run<B>(
        &self,
        backend: &B,
        file: &UploadFile,
        auth_token: &str,
        budget: RetryBudget,
    ) -> Result<MetricPayload, WorkflowError>
    where
        B: AnalysisBackend + ?Sized,
    {
        let invocation = self.begin();
        self.run_invocation(&invocation, backend, file, auth_token, budget)
            .await
    }

    /// Run an already started invocation and publish its result.
    /// A cancelled run leaves the slot untouched.
    pub async fn run_invocation<B>(
        &self,
        invocation: &Invocation,
        backend: &B,
        file: &UploadFile,
        auth_token: &str,
        budget: RetryBudget,
    ) -> Result<MetricPayload, WorkflowError>
    where
        B: AnalysisBackend + ?Sized,
    {
        let result =
            run_analysis_with_cancel(backend, file, auth_token, budget, invocation.token()).await;
        if !result.as_ref().is_err_and(WorkflowError::is_cancelled) {
            self.publish(invocation, result.clone());
        }
        result
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SlotState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for AnalysisSlot {
    fn default() -> Self {
        Self::new()
    }
}
