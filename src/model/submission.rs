use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Category of an open call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubmissionType {
    Exhibition,
    Residency,
    Competition,
    Grant,
    Conference,
    Other,
}

impl SubmissionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exhibition => "EXHIBITION",
            Self::Residency => "RESIDENCY",
            Self::Competition => "COMPETITION",
            Self::Grant => "GRANT",
            Self::Conference => "CONFERENCE",
            Self::Other => "OTHER",
        }
    }

    /// Parses a type label, ignoring case and surrounding whitespace
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "EXHIBITION" => Some(Self::Exhibition),
            "RESIDENCY" => Some(Self::Residency),
            "COMPETITION" => Some(Self::Competition),
            "GRANT" => Some(Self::Grant),
            "CONFERENCE" => Some(Self::Conference),
            "OTHER" => Some(Self::Other),
            _ => None,
        }
    }
}

impl fmt::Display for SubmissionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fields exactly as a crawler extracted them, before normalization
///
/// Everything is optional. Text fields accept numbers and booleans as their
/// string form; any other shape reads as missing. `requirements` and `tags`
/// are kept as raw JSON so a malformed value can be coerced instead of
/// rejecting the whole record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawRecord {
    #[serde(deserialize_with = "lenient_text")]
    pub title: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub description: Option<String>,
    #[serde(rename = "type", deserialize_with = "lenient_text")]
    pub type_hint: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub organizer: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub deadline: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub location: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub website: Option<String>,

    /// Free-form contact text; email and phone are extracted from it
    #[serde(deserialize_with = "lenient_text")]
    pub contact: Option<String>,

    pub fee: Option<serde_json::Value>,
    #[serde(deserialize_with = "lenient_text")]
    pub prize: Option<String>,
    pub requirements: serde_json::Value,
    pub tags: serde_json::Value,
}

/// Reads a scalar as text; arrays, objects and null become `None`
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        other => {
            if !other.is_null() {
                tracing::debug!("Ignoring non-text field value: {}", other);
            }
            None
        }
    })
}

/// A normalized listing ready to be upserted
#[derive(Debug, Clone, PartialEq)]
pub struct NewSubmission {
    pub title: String,
    pub description: String,
    pub submission_type: SubmissionType,
    pub organizer: String,
    pub deadline: NaiveDate,
    pub location: String,
    pub website: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub fee: Option<f64>,
    pub prize: String,
    pub requirements: BTreeMap<String, String>,
    pub tags: Vec<String>,
}

/// A stored listing, keyed by `(title, organizer)`
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionRecord {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub submission_type: SubmissionType,
    pub organizer: String,
    pub deadline: NaiveDate,
    pub location: String,
    pub website: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub fee: Option<f64>,
    pub prize: String,
    pub requirements: BTreeMap<String, String>,
    pub tags: Vec<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
