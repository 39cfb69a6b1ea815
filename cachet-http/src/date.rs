//! HTTP-date parsing.
//!
//! Accepts the three formats of RFC 9110, section 5.6.7:
//!
//! 1. IMF-fixdate: `Sun, 06 Nov 1994 08:49:37 GMT`
//! 2. RFC 850: `Sunday, 06-Nov-94 08:49:37 GMT`
//! 3. asctime: `Sun Nov  6 08:49:37 1994`

use chrono::{DateTime, NaiveDateTime, Utc};
use http::HeaderMap;
use http::header::HeaderName;

/// Parses an HTTP-date.
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(date) = DateTime::parse_from_rfc2822(value) {
        return Some(date.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDateTime::parse_from_str(value, "%A, %d-%b-%y %H:%M:%S GMT") {
        return Some(date.and_utc());
    }
    // asctime pads single-digit days with a space; collapse runs first.
    let collapsed = value.split_whitespace().collect::<Vec<_>>().join(" ");
    NaiveDateTime::parse_from_str(&collapsed, "%a %b %e %H:%M:%S %Y")
        .ok()
        .map(|date| date.and_utc())
}

/// Reads and parses the date header `name`.
pub fn header_date(headers: &HeaderMap, name: &HeaderName) -> Option<DateTime<Utc>> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_http_date)
}

/// Formats an instant as an IMF-fixdate.
pub fn format_http_date(date: DateTime<Utc>) -> String {
    date.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}
