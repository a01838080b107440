use crate::config::types::{
    Config, FetchConfig, SchedulerConfig, SourceEntry, StorageConfig, UserAgentConfig,
};
use crate::model::SourceKind;
use crate::ConfigError;
use chrono::NaiveTime;
use std::collections::HashSet;
use url::Url;

/// Upper bound on fetch retries; 2^10 backoff units is already very long
const MAX_FETCH_RETRIES: u32 = 10;

/// Upper bound on job retention, about a century
const MAX_RETENTION_DAYS: u32 = 36_500;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_user_agent_config(&config.user_agent)?;
    validate_fetch_config(&config.fetch)?;
    validate_scheduler_config(&config.scheduler)?;
    validate_storage_config(&config.storage)?;
    validate_sources(&config.sources)?;
    Ok(())
}

/// Parses an "HH:MM" time of day
pub fn parse_time_of_day(value: &str) -> Result<NaiveTime, ConfigError> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").map_err(|e| {
        ConfigError::Validation(format!(
            "time of day must be formatted HH:MM, got '{}': {}",
            value, e
        ))
    })
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Validate crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if config.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "fetch timeout-secs must be >= 1".to_string(),
        ));
    }

    if config.max_retries > MAX_FETCH_RETRIES {
        return Err(ConfigError::Validation(format!(
            "fetch max-retries must be <= {}, got {}",
            MAX_FETCH_RETRIES, config.max_retries
        )));
    }

    Ok(())
}

fn validate_scheduler_config(config: &SchedulerConfig) -> Result<(), ConfigError> {
    let intervals = [
        ("poll-interval-secs", config.poll_interval_secs),
        ("error-backoff-secs", config.error_backoff_secs),
        ("dispatch-interval-mins", config.dispatch_interval_mins),
        ("reload-interval-mins", config.reload_interval_mins),
        ("stop-timeout-secs", config.stop_timeout_secs),
    ];

    for (name, value) in intervals {
        if value == 0 {
            return Err(ConfigError::Validation(format!(
                "scheduler {} must be >= 1",
                name
            )));
        }
    }

    if config.retention_days == 0 || config.retention_days > MAX_RETENTION_DAYS {
        return Err(ConfigError::Validation(format!(
            "scheduler retention-days must be between 1 and {}, got {}",
            MAX_RETENTION_DAYS, config.retention_days
        )));
    }

    parse_time_of_day(&config.purge_at)?;

    Ok(())
}

fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates declared data sources
fn validate_sources(sources: &[SourceEntry]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();

    for source in sources {
        if source.id.is_empty() {
            return Err(ConfigError::Validation(format!(
                "source '{}' must have a non-empty id",
                source.name
            )));
        }

        if !seen.insert(source.id.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate source id '{}'",
                source.id
            )));
        }

        if source.crawler.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "source '{}' must name a crawler",
                source.id
            )));
        }

        if source.frequency_hours == 0 {
            return Err(ConfigError::Validation(format!(
                "source '{}' frequency-hours must be >= 1",
                source.id
            )));
        }

        if SourceKind::from_db_string(&source.kind).is_none() {
            return Err(ConfigError::Validation(format!(
                "source '{}' kind must be 'website' or 'api', got '{}'",
                source.id, source.kind
            )));
        }

        Url::parse(&source.url).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid URL for source '{}': {}", source.id, e))
        })?;
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    let (local, domain) = match email.split_once('@') {
        Some(parts) => parts,
        None => {
            return Err(ConfigError::Validation(format!(
                "Invalid email format: '{}'",
                email
            )))
        }
    };

    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
