//! Record pipeline: normalize, classify and deduplicate crawled listings
//!
//! Every raw record a crawler discovers goes through [`RecordPipeline::ingest`]:
//!
//! 1. Clean free-text fields
//! 2. Resolve the deadline (falling back to 30 days out)
//! 3. Extract email and phone from the contact text
//! 4. Classify the type when none was given
//! 5. Upsert on the `(title, organizer)` key
//!
//! A bad record is reported as an [`IngestError`]; callers log it and move on.

mod classify;
mod clean;
mod contact;
mod deadline;

pub use classify::classify;
pub use clean::{clean_optional, clean_text};
pub use contact::{extract_email, extract_phone};
pub use deadline::{parse_deadline_str, resolve_deadline, FALLBACK_DEADLINE_DAYS};

use crate::model::{NewSubmission, RawRecord, SubmissionType};
use crate::storage::{lock_store, SharedSubmissionStore, StorageError, UpsertOutcome};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

/// A record that cannot become a listing
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("record has no title after cleaning")]
    EmptyTitle,
}

/// Errors from ingesting a single record
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Invalid record: {0}")]
    Validation(#[from] ValidationError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Normalizes raw records and upserts them into the submission store
#[derive(Clone)]
pub struct RecordPipeline {
    store: SharedSubmissionStore,
}

impl RecordPipeline {
    pub fn new(store: SharedSubmissionStore) -> Self {
        Self { store }
    }

    /// Ingests one raw record as of now
    pub fn ingest(&self, raw: &RawRecord) -> Result<UpsertOutcome, IngestError> {
        self.ingest_at(raw, Utc::now())
    }

    /// Ingests one raw record with an explicit clock
    ///
    /// # Arguments
    ///
    /// * `raw` - Fields exactly as the crawler extracted them
    /// * `now` - Used for the fallback deadline and the stored timestamps
    ///
    /// # Returns
    ///
    /// * `Ok(UpsertOutcome::Created(id))` - A new listing was stored
    /// * `Ok(UpsertOutcome::Updated(id))` - An existing listing was refreshed
    /// * `Err(IngestError)` - The record was rejected or could not be stored
    pub fn ingest_at(
        &self,
        raw: &RawRecord,
        now: DateTime<Utc>,
    ) -> Result<UpsertOutcome, IngestError> {
        let submission = normalize(raw, now)?;

        let mut store = lock_store(&self.store, "submission store")?;
        let outcome = store.upsert_submission(&submission, now)?;

        tracing::debug!(
            "{} listing {} '{}' ({})",
            if outcome.is_created() { "Stored" } else { "Refreshed" },
            outcome.id(),
            submission.title,
            submission.submission_type
        );

        Ok(outcome)
    }
}

/// Turns a raw record into a storable listing without touching the store
pub fn normalize(raw: &RawRecord, now: DateTime<Utc>) -> Result<NewSubmission, ValidationError> {
    let title = clean_optional(raw.title.as_deref());
    if title.is_empty() {
        return Err(ValidationError::EmptyTitle);
    }

    let description = clean_optional(raw.description.as_deref());
    let contact = raw.contact.as_deref().unwrap_or_default();

    // OTHER or an unknown label counts as "not supplied"
    let submission_type = match raw.type_hint.as_deref().and_then(SubmissionType::parse) {
        Some(kind) if kind != SubmissionType::Other => kind,
        _ => classify(&title, &description),
    };

    Ok(NewSubmission {
        deadline: resolve_deadline(raw.deadline.as_deref(), now),
        organizer: clean_optional(raw.organizer.as_deref()),
        location: clean_optional(raw.location.as_deref()),
        website: raw.website.as_deref().map(str::trim).unwrap_or_default().to_string(),
        email: extract_email(contact),
        phone: extract_phone(contact),
        fee: coerce_fee(raw.fee.as_ref()),
        prize: clean_optional(raw.prize.as_deref()),
        requirements: coerce_requirements(&raw.requirements),
        tags: coerce_tags(&raw.tags),
        title,
        description,
        submission_type,
    })
}

/// Numeric fees (or numeric strings) survive; anything else becomes `None`
fn coerce_fee(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

/// Keeps scalar entries of a JSON object; a non-object becomes an empty map
fn coerce_requirements(value: &Value) -> BTreeMap<String, String> {
    let Value::Object(map) = value else {
        if !value.is_null() {
            tracing::debug!("Ignoring malformed requirements: {}", value);
        }
        return BTreeMap::new();
    };

    map.iter()
        .filter_map(|(key, v)| {
            let v = match v {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                _ => return None,
            };
            Some((key.clone(), v))
        })
        .collect()
}

/// Keeps non-empty cleaned string elements of a JSON array
fn coerce_tags(value: &Value) -> Vec<String> {
    let Value::Array(items) = value else {
        if !value.is_null() {
            tracing::debug!("Ignoring malformed tags: {}", value);
        }
        return Vec::new();
    };

    items
        .iter()
        .filter_map(Value::as_str)
        .map(clean_text)
        .filter(|tag| !tag.is_empty())
        .collect()
}
