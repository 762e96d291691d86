//! Text and JSON rendering of poll results.

use crate::config::Selection;
use crate::poller::{MeasurementReading, PollReport};

/// Text shown in place of a value the device did not report.
pub const ABSENT: &str = "None";

/// Format a single value, or [`ABSENT`].
pub fn format_value(value: Option<f32>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => ABSENT.to_string(),
    }
}

/// One `id: value` line per reading, as printed for "all".
pub fn render_lines(readings: &[MeasurementReading]) -> String {
    readings
        .iter()
        .map(|r| format!("{}: {}\n", r.id, format_value(r.value)))
        .collect()
}

/// All readings as space-separated `id:value` pairs on one line, as
/// printed for a graph.
pub fn render_line(readings: &[MeasurementReading]) -> String {
    let pairs: Vec<String> = readings
        .iter()
        .map(|r| format!("{}:{}", r.id, format_value(r.value)))
        .collect();
    format!("{}\n", pairs.join(" "))
}

/// Render a report the way the selection is printed on the terminal.
pub fn render_text(report: &PollReport) -> String {
    match report.selection {
        Selection::All => render_lines(&report.readings),
        Selection::Graph(_) => render_line(&report.readings),
    }
}

/// Render a report as pretty-printed JSON. Absent values become `null`.
pub fn render_json(report: &PollReport) -> serde_json::Result<String> {
    serde_json::to_string_pretty(report)
}
