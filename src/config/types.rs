use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Callboard
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    pub storage: StorageConfig,
    #[serde(default, rename = "source")]
    pub sources: Vec<SourceEntry>,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

/// Outbound request pacing and retry policy
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    /// Fixed delay before every attempt (milliseconds)
    #[serde(rename = "request-delay-ms", default = "default_request_delay_ms")]
    pub request_delay_ms: u64,

    /// Upper bound of the uniform random jitter added to the delay (milliseconds)
    #[serde(rename = "jitter-ms", default = "default_jitter_ms")]
    pub jitter_ms: u64,

    /// Per-request timeout (seconds)
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Number of retries after the first attempt
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    /// Backoff unit; retry n waits `backoff-base-ms * 2^n` (milliseconds)
    #[serde(rename = "backoff-base-ms", default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            request_delay_ms: default_request_delay_ms(),
            jitter_ms: default_jitter_ms(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            backoff_base_ms: default_backoff_base_ms(),
        }
    }
}

/// Scheduler cadence configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    /// How often the polling loop wakes up (seconds)
    #[serde(rename = "poll-interval-secs", default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Pause after a failed tick before polling again (seconds)
    #[serde(rename = "error-backoff-secs", default = "default_error_backoff_secs")]
    pub error_backoff_secs: u64,

    /// How often due sources are checked (minutes)
    #[serde(
        rename = "dispatch-interval-mins",
        default = "default_dispatch_interval_mins"
    )]
    pub dispatch_interval_mins: u64,

    /// How often the source catalog is reloaded (minutes)
    #[serde(rename = "reload-interval-mins", default = "default_reload_interval_mins")]
    pub reload_interval_mins: u64,

    /// Delay between consecutive dispatches within one check (seconds)
    #[serde(
        rename = "dispatch-spacing-secs",
        default = "default_dispatch_spacing_secs"
    )]
    pub dispatch_spacing_secs: u64,

    /// UTC time of day for the job purge, "HH:MM"
    #[serde(rename = "purge-at", default = "default_purge_at")]
    pub purge_at: String,

    /// Jobs older than this many days are purged
    #[serde(rename = "retention-days", default = "default_retention_days")]
    pub retention_days: u32,

    /// How long `stop` waits for the polling loop (seconds)
    #[serde(rename = "stop-timeout-secs", default = "default_stop_timeout_secs")]
    pub stop_timeout_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            error_backoff_secs: default_error_backoff_secs(),
            dispatch_interval_mins: default_dispatch_interval_mins(),
            reload_interval_mins: default_reload_interval_mins(),
            dispatch_spacing_secs: default_dispatch_spacing_secs(),
            purge_at: default_purge_at(),
            retention_days: default_retention_days(),
            stop_timeout_secs: default_stop_timeout_secs(),
        }
    }
}

impl SchedulerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_secs(self.error_backoff_secs)
    }

    pub fn dispatch_interval(&self) -> Duration {
        Duration::from_secs(self.dispatch_interval_mins.saturating_mul(60))
    }

    pub fn reload_interval(&self) -> Duration {
        Duration::from_secs(self.reload_interval_mins.saturating_mul(60))
    }

    pub fn dispatch_spacing(&self) -> Duration {
        Duration::from_secs(self.dispatch_spacing_secs)
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_secs(self.stop_timeout_secs)
    }
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// A data source declared in the configuration file
#[derive(Debug, Clone, Deserialize)]
pub struct SourceEntry {
    pub id: String,
    pub name: String,
    pub url: String,

    /// "website" or "api"
    #[serde(default = "default_source_kind")]
    pub kind: String,

    /// Logical name of the crawler bound to this source
    pub crawler: String,

    #[serde(rename = "frequency-hours")]
    pub frequency_hours: u32,

    #[serde(default = "default_true")]
    pub active: bool,

    /// Opaque settings interpreted only by the bound crawler
    #[serde(default)]
    pub config: serde_json::Value,
}

fn default_request_delay_ms() -> u64 {
    1000
}

fn default_jitter_ms() -> u64 {
    1000
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_backoff_base_ms() -> u64 {
    1000
}

fn default_poll_interval_secs() -> u64 {
    30
}

fn default_error_backoff_secs() -> u64 {
    60
}

fn default_dispatch_interval_mins() -> u64 {
    10
}

fn default_reload_interval_mins() -> u64 {
    60
}

fn default_dispatch_spacing_secs() -> u64 {
    2
}

fn default_purge_at() -> String {
    "02:00".to_string()
}

fn default_retention_days() -> u32 {
    7
}

fn default_stop_timeout_secs() -> u64 {
    5
}

fn default_source_kind() -> String {
    "website".to_string()
}

fn default_true() -> bool {
    true
}
