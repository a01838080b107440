//! Free-text cleaning applied to every listing field before storage

use regex::Regex;
use std::sync::LazyLock;

static WHITESPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Anything that is not a word character, whitespace, or allowed punctuation
static DISALLOWED_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[^\w\s\-.,!?()\[\]\{\}:;"']"#).unwrap());

/// Cleans a free-text field
///
/// Collapses whitespace runs to a single space, trims both ends, then drops
/// every character outside the allow-list. Word characters are Unicode-aware,
/// so CJK text survives intact.
pub fn clean_text(text: &str) -> String {
    let collapsed = WHITESPACE_RUN.replace_all(text.trim(), " ");
    DISALLOWED_CHARS.replace_all(&collapsed, "").into_owned()
}

/// Cleans an optional field, mapping `None` to an empty string
pub fn clean_optional(text: Option<&str>) -> String {
    text.map(clean_text).unwrap_or_default()
}
