use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

const NAIVE_DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

/// Parse the timestamp shapes found in simulation records.
///
/// Accepts RFC 3339 as well as the naive `YYYY-MM-DD[ HH:MM[:SS]]` forms, which
/// are read as UTC. Anything else is `None`; callers treat that as "unknown
/// time", never as "now".
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// The most recent parsable timestamp among `candidates`.
pub fn latest_timestamp<'a>(candidates: impl IntoIterator<Item = &'a str>) -> Option<DateTime<Utc>> {
    candidates.into_iter().filter_map(parse_timestamp).max()
}
