//! Shared helpers and constants will live here.

use chrono::Utc;

pub const APP_NAME: &str = "resq_backend";

/// Epoch milliseconds, the timestamp unit used across all stored documents.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Renders an epoch-millisecond timestamp for console output.
pub fn format_millis(millis: i64) -> String {
    chrono::DateTime::from_timestamp_millis(millis)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| millis.to_string())
}

pub fn print_banner() {
    println!("{} v{}", APP_NAME, env!("CARGO_PKG_VERSION"));
    println!("ResQ PH community backend: feed, auth, tracker, hotlines, news");
}
