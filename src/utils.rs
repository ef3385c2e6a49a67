use chrono::{DateTime, NaiveDateTime};

const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parse the service's `time_last_update_utc` string.
///
/// Any offset in the string is dropped, not applied: "Fri, 27 Mar 2020 00:00:01 +0300"
/// becomes 2020-03-27 00:00:01.
pub fn parse_last_updated(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    DateTime::parse_from_rfc2822(raw)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .map(|dt| dt.naive_local())
        .ok()
        .or_else(|| NaiveDateTime::parse_from_str(raw, DISPLAY_FORMAT).ok())
}

pub fn format_timestamp(timestamp: &NaiveDateTime) -> String {
    timestamp.format(DISPLAY_FORMAT).to_string()
}
