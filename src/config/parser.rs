use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses and validates configuration from TOML text
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Logged at start-up so a run can be tied back to the exact configuration
/// it used.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MINIMAL: &str = r#"
[user-agent]
crawler-name = "TestCrawler"
crawler-version = "1.0"
contact-url = "https://example.com/about"
contact-email = "admin@example.com"

[storage]
database-path = "./test.db"
"#;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_minimal_config_uses_defaults() {
        let file = create_temp_config(MINIMAL);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.user_agent.crawler_name, "TestCrawler");
        assert_eq!(config.fetch.max_retries, 3);
        assert_eq!(config.fetch.timeout_secs, 30);
        assert_eq!(config.scheduler.poll_interval_secs, 30);
        assert_eq!(config.scheduler.dispatch_interval_mins, 10);
        assert_eq!(config.scheduler.purge_at, "02:00");
        assert_eq!(config.scheduler.retention_days, 7);
        assert!(config.sources.is_empty());
    }

    #[test]
    fn test_load_config_with_sources() {
        let content = format!(
            r#"{}
[fetch]
max-retries = 2
request-delay-ms = 0

[[source]]
id = "ff"
name = "Festival listings"
url = "https://example.com/festivals"
crawler = "demo"
frequency-hours = 24

[[source]]
id = "feed"
name = "Open call feed"
url = "https://example.com/api/calls"
kind = "api"
crawler = "json-feed"
frequency-hours = 6
active = false
config = {{ items-key = "items" }}
"#,
            MINIMAL
        );

        let file = create_temp_config(&content);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.fetch.max_retries, 2);
        assert_eq!(config.fetch.request_delay_ms, 0);
        assert_eq!(config.sources.len(), 2);
        assert_eq!(config.sources[0].kind, "website");
        assert!(config.sources[0].active);
        assert_eq!(config.sources[1].kind, "api");
        assert!(!config.sources[1].active);
        assert_eq!(config.sources[1].config["items-key"], "items");
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/config.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_load_config_with_invalid_toml() {
        let file = create_temp_config("this is not valid TOML {{{");
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_config_with_validation_error() {
        let content = format!("{}\n[scheduler]\npurge-at = \"late\"\n", MINIMAL);
        let file = create_temp_config(&content);
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_compute_config_hash() {
        let file = create_temp_config("test content");

        let hash1 = compute_config_hash(file.path()).unwrap();
        let hash2 = compute_config_hash(file.path()).unwrap();

        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_different_content_different_hash() {
        let file1 = create_temp_config("content 1");
        let file2 = create_temp_config("content 2");

        let hash1 = compute_config_hash(file1.path()).unwrap();
        let hash2 = compute_config_hash(file2.path()).unwrap();

        assert_ne!(hash1, hash2);
    }
}
