//! HTTP date rendering (RFC 1123, always GMT).

use std::time::SystemTime;

use chrono::{DateTime, Utc};

const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Formats `time` the way `Date` and `Last-Modified` expect it,
/// e.g. `Mon, 02 Jan 2006 15:04:05 GMT`.
pub fn format_http_date(time: SystemTime) -> String {
    DateTime::<Utc>::from(time).format(HTTP_DATE_FORMAT).to_string()
}
