//! Chart-ready series extraction
//!
//! Turns a metric's raw `measurements` into timestamped samples plus a small
//! statistical summary. Rendering is left to the consumer.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::models::{Metric, MetricId, MetricPayload};

const TIME_FIELD: &str = "time";
const HRV_FIELD: &str = "hrv";
const FALLBACK_VALUE_FIELD: &str = "rate";
const TIME_AXIS_LABEL: &str = "Time (s)";
const INDEX_AXIS_LABEL: &str = "Sample index";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    /// `"{seconds}s"` when samples carry a time, otherwise the sample index
    pub label: String,
    pub time_ms: Option<f64>,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSeries {
    pub metric: MetricId,
    pub x_axis_label: &'static str,
    pub axis_label: &'static str,
    pub value_key: String,
    pub points: Vec<SeriesPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSummary {
    pub metric: MetricId,
    pub label: &'static str,
    pub description: Option<String>,
    pub samples: usize,
    pub value_key: Option<String>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    pub trends: Vec<TrendEntry>,
}

/// One `trends.<name>.average` value with its display label and unit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendEntry {
    pub name: String,
    pub label: String,
    pub value: f64,
    pub unit: String,
}

/// Build the series for a metric. Returns `None` when there are no samples.
pub fn extract_series(id: MetricId, metric: &Metric) -> Option<MetricSeries> {
    let first = metric.measurements.first()?;
    let has_time = first.contains_key(TIME_FIELD);
    let value_key = value_key(first);

    let points = metric
        .measurements
        .iter()
        .enumerate()
        .map(|(index, sample)| {
            let time_ms = sample.get(TIME_FIELD).and_then(Value::as_f64);
            let label = if has_time {
                format!("{:.0}s", (time_ms.unwrap_or_default() / 1000.0).round())
            } else {
                index.to_string()
            };
            SeriesPoint {
                label,
                time_ms,
                value: sample.get(&value_key).and_then(Value::as_f64),
            }
        })
        .collect();

    Some(MetricSeries {
        metric: id,
        x_axis_label: if has_time {
            TIME_AXIS_LABEL
        } else {
            INDEX_AXIS_LABEL
        },
        axis_label: id.axis_label(),
        value_key,
        points,
    })
}

/// The first numeric field in document order other than `time` and `hrv`,
/// falling back to `rate`.
fn value_key(sample: &Map<String, Value>) -> String {
    sample
        .iter()
        .find(|(k, v)| k.as_str() != TIME_FIELD && k.as_str() != HRV_FIELD && v.is_number())
        .map(|(k, _)| k.clone())
        .unwrap_or_else(|| FALLBACK_VALUE_FIELD.to_string())
}

pub fn summarize_metric(id: MetricId, metric: &Metric) -> MetricSummary {
    let series = extract_series(id, metric);
    let values: Vec<f64> = series
        .iter()
        .flat_map(|s| s.points.iter().filter_map(|p| p.value))
        .collect();

    let min = values.iter().copied().reduce(f64::min);
    let max = values.iter().copied().reduce(f64::max);
    let mean = if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    };

    MetricSummary {
        metric: id,
        label: id.label(),
        description: metric.description.clone(),
        samples: metric.measurements.len(),
        value_key: series.map(|s| s.value_key),
        min,
        max,
        mean,
        trends: trend_entries(id, metric),
    }
}

/// Trend averages with labels and units. Trends without a numeric average are skipped.
pub fn trend_entries(id: MetricId, metric: &Metric) -> Vec<TrendEntry> {
    metric
        .trends
        .iter()
        .filter_map(|(name, trend)| {
            let value = trend.average?;
            let label = match name.as_str() {
                "rate" => "Average rate".to_string(),
                "hrv" => "Average HRV".to_string(),
                other => format!("Average {}", other),
            };
            let unit = match id {
                MetricId::Heartrate if name == "rate" => "bpm".to_string(),
                MetricId::Heartrate => metric
                    .units
                    .get(HRV_FIELD)
                    .cloned()
                    .flatten()
                    .unwrap_or_else(|| "ms".to_string()),
                MetricId::BrainPulsatility => "%".to_string(),
                MetricId::GIndex => "index".to_string(),
            };
            Some(TrendEntry {
                name: name.clone(),
                label,
                value,
                unit,
            })
        })
        .collect()
}

/// Summaries for every metric present in the payload, in dashboard order.
pub fn summarize_payload(payload: &MetricPayload) -> Vec<MetricSummary> {
    MetricId::ALL
        .iter()
        .filter_map(|id| payload.metric(*id).map(|m| summarize_metric(*id, &m)))
        .collect()
}
