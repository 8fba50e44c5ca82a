//! Formatting helpers shared across front ends.

use chrono::{DateTime, FixedOffset, NaiveDate};

use crate::analytics::ALL_BUCKET_LABEL;

/// Format a response timestamp for the feedback table (e.g., "2024-03-01 10:15").
pub fn format_answer_time(ts: &DateTime<FixedOffset>) -> String {
    ts.format("%Y-%m-%d %H:%M").to_string()
}

/// Format a bucket label as a chart tick (e.g., "03/01").
///
/// The all-period label and anything that is not a date pass through unchanged.
pub fn format_bucket_tick(label: &str) -> String {
    if label == ALL_BUCKET_LABEL {
        return label.to_string();
    }
    match NaiveDate::parse_from_str(label, "%Y-%m-%d") {
        Ok(date) => date.format("%m/%d").to_string(),
        Err(_) => label.to_string(),
    }
}

/// Format a 0.0-1.0 share as a percentage (e.g., "66.7%").
pub fn format_share(share: f64, decimals: usize) -> String {
    format!("{:.*}%", decimals, share * 100.0)
}
