use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// The three metrics a payload can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MetricId {
    Heartrate,
    GIndex,
    BrainPulsatility,
}

impl MetricId {
    pub const ALL: [MetricId; 3] = [
        MetricId::Heartrate,
        MetricId::GIndex,
        MetricId::BrainPulsatility,
    ];

    /// Field name of this metric in the result document.
    pub fn payload_key(self) -> &'static str {
        match self {
            MetricId::Heartrate => "heartrate",
            MetricId::GIndex => "gIndex",
            MetricId::BrainPulsatility => "brainPulsatility",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MetricId::Heartrate => "Heart rate",
            MetricId::GIndex => "G-index",
            MetricId::BrainPulsatility => "Brain pulsatility",
        }
    }

    /// Y axis label used when charting the metric.
    pub fn axis_label(self) -> &'static str {
        match self {
            MetricId::Heartrate => "Heart rate (bpm)",
            MetricId::GIndex => "G-index",
            MetricId::BrainPulsatility => "Brain pulsatility (%)",
        }
    }
}

impl fmt::Display for MetricId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.payload_key())
    }
}

impl FromStr for MetricId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect::<String>()
            .to_lowercase();
        match normalized.as_str() {
            "heartrate" | "hr" => Ok(MetricId::Heartrate),
            "gindex" => Ok(MetricId::GIndex),
            "brainpulsatility" => Ok(MetricId::BrainPulsatility),
            _ => Err(format!(
                "Unknown metric '{}'. Must be one of: heartrate, gindex, brain-pulsatility",
                s
            )),
        }
    }
}

/// Average reported for one measured quantity.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Trend {
    #[serde(default)]
    pub average: Option<f64>,
}

/// One metric series as emitted by the analysis backend.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Metric {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub errors: Vec<Value>,
    #[serde(default)]
    pub units: BTreeMap<String, Option<String>>,
    /// Samples; `time` is in milliseconds when present.
    #[serde(default)]
    pub measurements: Vec<Map<String, Value>>,
    #[serde(default)]
    pub trends: BTreeMap<String, Trend>,
}
