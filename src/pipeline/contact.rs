//! Email and phone extraction from free-form contact text

use regex::Regex;
use std::sync::LazyLock;

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").unwrap()
});

/// Phone patterns in priority order: North American, China country code, generic 3-3-4
static PHONE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"\+?1?[-.\s]?\(?([0-9]{3})\)?[-.\s]?([0-9]{3})[-.\s]?([0-9]{4})").unwrap(),
        Regex::new(r"\+?86[-.\s]?([0-9]{3,4})[-.\s]?([0-9]{7,8})").unwrap(),
        Regex::new(r"(\d{3}[-.\s]?\d{3}[-.\s]?\d{4})").unwrap(),
    ]
});

/// Returns the first email address found in `text`
pub fn extract_email(text: &str) -> Option<String> {
    EMAIL.find(text).map(|m| m.as_str().to_string())
}

/// Returns the digits of the first phone number found in `text`
///
/// Patterns are tried in order and the first one that matches anywhere wins.
/// Separators are dropped so only the captured digits remain.
pub fn extract_phone(text: &str) -> Option<String> {
    PHONE_PATTERNS.iter().find_map(|pattern| {
        pattern.captures(text).map(|caps| {
            caps.iter()
                .skip(1)
                .flatten()
                .flat_map(|group| group.as_str().chars())
                .filter(char::is_ascii_digit)
                .collect()
        })
    })
}
