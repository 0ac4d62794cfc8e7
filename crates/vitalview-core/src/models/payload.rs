use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::borrow::Cow;

use super::metric::{Metric, MetricId};
use crate::error::WorkflowError;

/// Decoded analysis result document.
///
/// Only `errors` and `result.error` are interpreted by the workflow; every
/// other field (version, created, heartrate, gIndex, brainPulsatility, ...)
/// is kept verbatim for the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricPayload(Map<String, Value>);

impl MetricPayload {
    /// Wrap a decoded JSON value. The payload must be a JSON object.
    pub fn from_value(value: Value) -> Result<Self, WorkflowError> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(WorkflowError::Configuration(format!(
                "Analysis result is not a JSON object: {}",
                type_name(&other)
            ))),
        }
    }

    /// Error descriptors reported by the backend. A missing or non-array
    /// `errors` field reads as empty.
    pub fn errors(&self) -> &[Value] {
        self.0
            .get("errors")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Nested failure indicator `result.error`, if set.
    pub fn result_error(&self) -> Option<Cow<'_, str>> {
        match self.0.get("result")?.get("error")? {
            Value::Null | Value::Bool(false) => None,
            Value::String(s) if s.is_empty() => None,
            Value::Number(n) if n.as_f64() == Some(0.0) => None,
            Value::String(s) => Some(Cow::Borrowed(s.as_str())),
            other => Some(Cow::Owned(other.to_string())),
        }
    }

    /// Reject payloads in which the backend reports a failed analysis.
    pub fn validate(self) -> Result<Self, WorkflowError> {
        let errors = self.errors();
        if !errors.is_empty() {
            let summary = errors
                .iter()
                .map(describe_error)
                .collect::<Vec<_>>()
                .join("; ");
            let noun = if errors.len() == 1 { "error" } else { "errors" };
            return Err(WorkflowError::Analysis(format!(
                "{} {} reported: {}",
                errors.len(),
                noun,
                summary
            )));
        }

        if let Some(message) = self.result_error() {
            return Err(WorkflowError::Analysis(message.into_owned()));
        }

        Ok(self)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Typed view of one of the dashboard metrics, if present and well-formed.
    pub fn metric(&self, id: MetricId) -> Option<Metric> {
        let value = self.0.get(id.payload_key())?;
        if value.is_null() {
            return None;
        }
        serde_json::from_value(value.clone()).ok()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

fn describe_error(entry: &Value) -> String {
    match entry {
        Value::String(s) => s.clone(),
        Value::Object(obj) => match obj.get("message").and_then(Value::as_str) {
            Some(message) => message.to_string(),
            None => entry.to_string(),
        },
        other => other.to_string(),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
