//! Date/time utilities for Gator.

use chrono::{DateTime, Utc};

use crate::{GatorError, Result};

/// Layout of an RSS `pubDate`: RFC 1123 with a numeric zone,
/// e.g. `Mon, 02 Jan 2006 15:04:05 -0700`.
pub const PUB_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S %z";

/// Display format used by command output.
pub const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Parse an item's publish date and normalize it to UTC.
///
/// Only the numeric-offset layout is accepted; named zones such as `GMT`
/// are rejected.
pub fn parse_pub_date(value: &str) -> Result<DateTime<Utc>> {
    let trimmed = value.trim();
    DateTime::parse_from_str(trimmed, PUB_DATE_FORMAT)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| GatorError::InvalidDate(format!("{trimmed:?}: {e}")))
}

/// Format an optional timestamp for display.
pub fn format_optional(dt: Option<&DateTime<Utc>>) -> String {
    match dt {
        Some(dt) => dt.format(DISPLAY_FORMAT).to_string(),
        None => "never".to_string(),
    }
}
