//! Scripted backend for orchestrator and slot tests.

use async_trait::async_trait;
use reqwest::Url;
use serde_json::{json, Value};
use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;
use vitalview_core::{AnalysisOutcome, UploadCredentials, WorkflowError};

use crate::backend::AnalysisBackend;
use crate::uploader::UploadFile;

pub const TOKEN: &str = "test-token";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Credentials(String),
    Upload(String),
    Poll(String),
    FetchIndirect(String),
}

/// Backend that replays canned results. Once the poll script runs dry every
/// further poll reports `Pending`.
pub struct ScriptedBackend {
    credentials: Result<UploadCredentials, WorkflowError>,
    upload: Result<(), WorkflowError>,
    polls: Mutex<VecDeque<Result<AnalysisOutcome, WorkflowError>>>,
    indirect: Result<Value, WorkflowError>,
    poll_latency: Duration,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self {
            credentials: Ok(credentials_with_fields(&[("key", "uploads/rec.001")])),
            upload: Ok(()),
            polls: Mutex::new(VecDeque::new()),
            indirect: Ok(json!({ "errors": [] })),
            poll_latency: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_credentials(mut self, result: Result<UploadCredentials, WorkflowError>) -> Self {
        self.credentials = result;
        self
    }

    pub fn with_upload(mut self, result: Result<(), WorkflowError>) -> Self {
        self.upload = result;
        self
    }

    pub fn with_polls(self, polls: Vec<Result<AnalysisOutcome, WorkflowError>>) -> Self {
        *self.polls.lock().unwrap() = polls.into();
        self
    }

    pub fn with_indirect(mut self, result: Result<Value, WorkflowError>) -> Self {
        self.indirect = result;
        self
    }

    pub fn with_poll_latency(mut self, latency: Duration) -> Self {
        self.poll_latency = latency;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| pred(c)).count()
    }

    pub fn credential_count(&self) -> usize {
        self.count(|c| matches!(c, Call::Credentials(_)))
    }

    pub fn upload_count(&self) -> usize {
        self.count(|c| matches!(c, Call::Upload(_)))
    }

    pub fn poll_count(&self) -> usize {
        self.count(|c| matches!(c, Call::Poll(_)))
    }

    pub fn indirect_calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter_map(|c| match c {
                Call::FetchIndirect(url) => Some(url.clone()),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl AnalysisBackend for ScriptedBackend {
    async fn request_credentials(
        &self,
        _auth_token: &str,
        output_format: &str,
    ) -> Result<UploadCredentials, WorkflowError> {
        self.record(Call::Credentials(output_format.to_string()));
        self.credentials.clone()
    }

    async fn upload(
        &self,
        file: &UploadFile,
        _credentials: &UploadCredentials,
    ) -> Result<(), WorkflowError> {
        self.record(Call::Upload(file.file_name().to_string()));
        self.upload.clone()
    }

    async fn poll_once(
        &self,
        key: &str,
        _auth_token: &str,
    ) -> Result<AnalysisOutcome, WorkflowError> {
        self.record(Call::Poll(key.to_string()));
        if !self.poll_latency.is_zero() {
            tokio::time::sleep(self.poll_latency).await;
        }
        let next = self.polls.lock().unwrap().pop_front();
        next.unwrap_or(Ok(AnalysisOutcome::Pending))
    }

    async fn fetch_indirect(&self, result_url: &Url) -> Result<Value, WorkflowError> {
        self.record(Call::FetchIndirect(result_url.to_string()));
        self.indirect.clone()
    }
}

pub fn sample_file() -> UploadFile {
    UploadFile::new("rec.001", b"SENSOR-BYTES".to_vec())
}

pub fn credentials_with_fields(fields: &[(&str, &str)]) -> UploadCredentials {
    let fields: BTreeMap<String, String> = fields
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    UploadCredentials::new(Url::parse("https://bucket.example.com/").unwrap(), fields)
}

/// `count` pending polls followed by `last`.
pub fn pending_then(
    count: usize,
    last: Result<AnalysisOutcome, WorkflowError>,
) -> Vec<Result<AnalysisOutcome, WorkflowError>> {
    let mut polls: Vec<_> = (0..count).map(|_| Ok(AnalysisOutcome::Pending)).collect();
    polls.push(last);
    polls
}

pub fn indirect(url: &str) -> AnalysisOutcome {
    AnalysisOutcome::Indirect(Url::parse(url).unwrap())
}
