use crate::config::SourceEntry;
use crate::ConfigError;
use chrono::{DateTime, Duration, Utc};
use std::fmt;

/// How a data source is accessed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Website,
    Api,
}

impl SourceKind {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Website => "website",
            Self::Api => "api",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "website" => Some(Self::Website),
            "api" => Some(Self::Api),
            _ => None,
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

/// A configured origin to poll
#[derive(Debug, Clone, PartialEq)]
pub struct DataSource {
    pub id: String,
    pub name: String,
    pub url: String,
    pub kind: SourceKind,

    /// Logical name of the crawler that handles this source
    pub crawler_name: String,

    /// Recrawl interval in whole hours, always > 0
    pub frequency_hours: u32,

    pub active: bool,
    pub last_crawled_at: Option<DateTime<Utc>>,

    /// Opaque settings interpreted only by the bound crawler
    pub config: serde_json::Value,
}

impl DataSource {
    /// Earliest time the source becomes due, `None` if it has never been crawled
    pub fn next_due_at(&self) -> Option<DateTime<Utc>> {
        self.last_crawled_at
            .map(|last| {
                Duration::try_hours(i64::from(self.frequency_hours))
                    .and_then(|interval| last.checked_add_signed(interval))
                    .unwrap_or(DateTime::<Utc>::MAX_UTC)
            })
    }

    /// Returns true if the source should be crawled at `now`
    ///
    /// Inactive sources are never due. Active sources are due when they have
    /// never been crawled or their interval has fully elapsed.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        if !self.active {
            return false;
        }

        match self.next_due_at() {
            None => true,
            Some(due) => now >= due,
        }
    }
}

impl TryFrom<&SourceEntry> for DataSource {
    type Error = ConfigError;

    fn try_from(entry: &SourceEntry) -> Result<Self, Self::Error> {
        let kind = SourceKind::from_db_string(&entry.kind).ok_or_else(|| {
            ConfigError::Validation(format!(
                "source '{}' has unknown kind '{}'",
                entry.id, entry.kind
            ))
        })?;

        if entry.frequency_hours == 0 {
            return Err(ConfigError::Validation(format!(
                "source '{}' frequency-hours must be >= 1",
                entry.id
            )));
        }

        Ok(Self {
            id: entry.id.clone(),
            name: entry.name.clone(),
            url: entry.url.clone(),
            kind,
            crawler_name: entry.crawler.clone(),
            frequency_hours: entry.frequency_hours,
            active: entry.active,
            last_crawled_at: None,
            config: entry.config.clone(),
        })
    }
}
