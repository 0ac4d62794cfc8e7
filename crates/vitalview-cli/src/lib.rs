use anyhow::Context;
use std::fmt::Write as _;
use std::path::Path;
use vitalview_core::{summarize_payload, MetricPayload, MetricSummary};

/// Truncate a string to max_len characters, appending "..." if truncated.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Initialize tracing for the CLI. Logs go to stderr so stdout stays valid JSON.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Load a previously saved analysis result and run the same validation the
/// workflow applies to fresh results.
pub fn load_payload(path: &Path) -> anyhow::Result<MetricPayload> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let value: serde_json::Value =
        serde_json::from_str(&raw).with_context(|| format!("{} is not JSON", path.display()))?;
    let payload = MetricPayload::from_value(value).context("Unexpected result shape")?;
    payload.validate().context("Analysis result reports errors")
}

fn fmt_value(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.2}", v))
}

/// Plain-text table with one row per metric.
pub fn render_summary(summaries: &[MetricSummary]) -> String {
    let mut out = String::new();
    if summaries.is_empty() {
        out.push_str("No metrics in result\n");
        return out;
    }

    let _ = writeln!(
        out,
        "{:<20} {:>8} {:<14} {:>10} {:>10} {:>10}",
        "Metric", "Samples", "Field", "Min", "Max", "Mean"
    );
    let _ = writeln!(out, "{}", "-".repeat(77));
    for summary in summaries {
        let _ = writeln!(
            out,
            "{:<20} {:>8} {:<14} {:>10} {:>10} {:>10}",
            truncate_string(summary.label, 20),
            summary.samples,
            truncate_string(summary.value_key.as_deref().unwrap_or("-"), 14),
            fmt_value(summary.min),
            fmt_value(summary.max),
            fmt_value(summary.mean),
        );
        for trend in &summary.trends {
            let _ = writeln!(out, "  {}: {:.2} {}", trend.label, trend.value, trend.unit);
        }
    }
    out
}

pub fn render_payload_summary(payload: &MetricPayload) -> String {
    render_summary(&summarize_payload(payload))
}
