//! Shared utility functions for the keygate server.

use axum::http::HeaderMap;
use chrono::Utc;

pub const SECONDS_PER_DAY: i64 = 86400;

/// `days` as seconds, or `None` if that overflows.
pub fn days_to_seconds(days: i64) -> Option<i64> {
    days.checked_mul(SECONDS_PER_DAY)
}

/// Current unix timestamp in seconds.
pub fn now() -> i64 {
    Utc::now().timestamp()
}

/// Trim client input, treating whitespace-only values as missing.
pub fn normalize(input: &str) -> Option<&str> {
    let trimmed = input.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

/// Same as [`normalize`] for optional fields such as display names.
pub fn normalize_opt(input: Option<&str>) -> Option<&str> {
    input.and_then(normalize)
}

/// Extract client IP address from proxy headers for request logging.
///
/// Tries `x-forwarded-for` first, then `x-real-ip`.
pub fn client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .or_else(|| headers.get("x-real-ip"))
        .and_then(|v| v.to_str().ok())
        .map(|s| s.split(',').next().unwrap_or(s).trim().to_string())
}
