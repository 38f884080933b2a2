/// Utility functions for timestamps and human-readable output
use time::macros::format_description;
use time::OffsetDateTime;

use crate::models::SummaryRecord;

const ABSENT: &str = "-";

/// Format a timestamp for human-readable logging
///
/// Converts an OffsetDateTime to DD.MM.YYYY - HH:MM:SS format
/// Falls back to default string representation if formatting fails.
pub fn format_datetime(dt: &OffsetDateTime) -> String {
    let format = format_description!("[day].[month].[year] - [hour]:[minute]:[second]");
    dt.format(format).unwrap_or_else(|_| dt.to_string())
}

/// Format the timestamp attached to an RSSI sample
///
/// The key carries the full date so it never repeats within a long-running
/// session, and contains no whitespace so it can be typed as one word.
pub fn format_timestamp(dt: &OffsetDateTime) -> String {
    let format = format_description!(
        "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]"
    );
    dt.format(format).unwrap_or_else(|_| dt.to_string())
}

/// Convert a time::Duration to seconds as u64
pub fn duration_to_seconds(duration: time::Duration) -> u64 {
    duration.whole_seconds().max(0) as u64
}

fn or_absent<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| ABSENT.to_string())
}

fn decimal_or_absent(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.2}", v))
        .unwrap_or_else(|| ABSENT.to_string())
}

/// Render a summary as display lines, absent statistics shown as `-`
pub fn summary_lines(summary: &SummaryRecord) -> Vec<String> {
    let time_range = summary
        .time_range
        .as_ref()
        .map(|r| format!("{} - {}", r.start, r.end))
        .unwrap_or_else(|| ABSENT.to_string());

    vec![
        format!("Mean: {} dBm", decimal_or_absent(summary.mean)),
        format!("Median RSSI: {} dBm", decimal_or_absent(summary.median)),
        format!("Total Points Measured: {}", summary.sample_count),
        format!("Smallest Value: {} dBm", or_absent(summary.min)),
        format!("Largest Value: {} dBm", or_absent(summary.max)),
        format!("Range of RSSI: {} dB", or_absent(summary.range)),
        format!(
            "Standard Deviation: {}",
            decimal_or_absent(summary.standard_deviation)
        ),
        format!("Time Range: {}", time_range),
    ]
}

/// Render a resolved chart selection
pub fn selection_line(timestamp: &str, rssi: Option<i16>) -> String {
    format!("Selected time: {} | RSSI: {} dBm", timestamp, or_absent(rssi))
}
