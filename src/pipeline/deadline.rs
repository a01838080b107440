//! Deadline parsing with a fixed, ordered list of accepted formats

use chrono::{DateTime, Duration, NaiveDate, Utc};

/// Accepted deadline formats, tried in order; the first successful parse wins
const DEADLINE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%Y年%m月%d日",
];

/// Days added to the ingestion time when no deadline can be parsed
pub const FALLBACK_DEADLINE_DAYS: i64 = 30;

/// Parses a deadline string against the accepted formats
pub fn parse_deadline_str(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    DEADLINE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
}

/// Resolves the deadline of a listing
///
/// A missing or unparsable value is not an error: the listing gets a deadline
/// of `now + 30 days` so consumers always see a usable date.
pub fn resolve_deadline(value: Option<&str>, now: DateTime<Utc>) -> NaiveDate {
    match value.and_then(parse_deadline_str) {
        Some(date) => date,
        None => {
            if let Some(raw) = value {
                tracing::debug!("Unparsable deadline '{}', using fallback", raw);
            }
            (now + Duration::days(FALLBACK_DEADLINE_DAYS)).date_naive()
        }
    }
}
