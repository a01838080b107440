//! HTTP fetcher implementation
//!
//! This module handles every outbound request made by crawlers, including:
//! - Building the shared HTTP client with the configured user agent
//! - Pacing each attempt with a fixed delay plus random jitter
//! - Retrying failed attempts with exponential backoff
//! - Reporting a terminal failure as a value, never a panic

use crate::config::{FetchConfig, UserAgentConfig};
use rand::Rng;
use reqwest::{redirect::Policy, Client};
use std::time::Duration;
use thiserror::Error;

/// Terminal failure after every attempt was used up
#[derive(Debug, Clone, Error)]
#[error("Failed to fetch {url} after {attempts} attempt(s): {cause}")]
pub struct FetchError {
    /// The URL that was requested
    pub url: String,
    /// Number of attempts made, including the first
    pub attempts: u32,
    /// Description of the last failure
    pub cause: String,
}

/// Pacing and retry policy for outbound requests
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchPolicy {
    /// Fixed delay before every attempt
    pub request_delay: Duration,
    /// Upper bound (exclusive) of the uniform jitter added to the delay
    pub jitter: Duration,
    /// Per-request timeout
    pub timeout: Duration,
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Backoff unit; the wait after failed attempt n is `backoff_base * 2^n`
    pub backoff_base: Duration,
}

impl FetchPolicy {
    /// Pause inserted before an attempt
    pub fn pacing_delay(&self) -> Duration {
        let jitter_ms = self.jitter.as_millis() as u64;
        if jitter_ms == 0 {
            return self.request_delay;
        }
        self.request_delay + Duration::from_millis(rand::rng().random_range(0..jitter_ms))
    }

    /// Wait after failed attempt `attempt` (counted from 0) before the next one
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.backoff_base
            .saturating_mul(2u32.saturating_pow(attempt))
    }

    /// Total number of attempts the policy allows
    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }
}

impl From<&FetchConfig> for FetchPolicy {
    fn from(config: &FetchConfig) -> Self {
        Self {
            request_delay: Duration::from_millis(config.request_delay_ms),
            jitter: Duration::from_millis(config.jitter_ms),
            timeout: Duration::from_secs(config.timeout_secs),
            max_retries: config.max_retries,
            backoff_base: Duration::from_millis(config.backoff_base_ms),
        }
    }
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self::from(&FetchConfig::default())
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
/// * `timeout` - Per-request timeout
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use callboard::config::UserAgentConfig;
/// use callboard::crawler::build_http_client;
/// use std::time::Duration;
///
/// let config = UserAgentConfig {
///     crawler_name: "Callboard".to_string(),
///     crawler_version: "0.1".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config, Duration::from_secs(30)).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    // Format: CrawlerName/Version (+ContactURL; ContactEmail)
    let user_agent = format!(
        "{}/{} (+{}; {})",
        config.crawler_name, config.crawler_version, config.contact_url, config.contact_email
    );

    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Paced, retrying HTTP client shared by all crawlers
#[derive(Debug, Clone)]
pub struct FetchClient {
    client: Client,
    policy: FetchPolicy,
}

impl FetchClient {
    pub fn new(client: Client, policy: FetchPolicy) -> Self {
        Self { client, policy }
    }

    /// Builds the client from configuration
    pub fn from_config(
        user_agent: &UserAgentConfig,
        fetch: &FetchConfig,
    ) -> Result<Self, reqwest::Error> {
        let policy = FetchPolicy::from(fetch);
        let client = build_http_client(user_agent, policy.timeout)?;
        Ok(Self::new(client, policy))
    }

    pub fn policy(&self) -> &FetchPolicy {
        &self.policy
    }

    /// Fetches a URL as text
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | 2xx | Return the body |
    /// | Any other status | Retry |
    /// | Timeout / connection error | Retry |
    /// | Body read error | Retry |
    ///
    /// Every attempt is preceded by the pacing delay. Failed attempt `n`
    /// (counted from 0) is followed by a `backoff_base * 2^n` wait, except the
    /// last one, which returns a [`FetchError`] carrying its cause.
    pub async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let max_attempts = self.policy.max_attempts();
        let mut last_cause = String::new();

        for attempt in 0..max_attempts {
            tokio::time::sleep(self.policy.pacing_delay()).await;

            match self.try_once(url).await {
                Ok(body) => {
                    if attempt > 0 {
                        tracing::info!("Fetched {} on attempt {}", url, attempt + 1);
                    }
                    return Ok(body);
                }
                Err(cause) => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        max_attempts,
                        "Fetch of {} failed: {}",
                        url,
                        cause
                    );
                    last_cause = cause;
                }
            }

            if attempt + 1 < max_attempts {
                tokio::time::sleep(self.policy.backoff(attempt)).await;
            }
        }

        Err(FetchError {
            url: url.to_string(),
            attempts: max_attempts,
            cause: last_cause,
        })
    }

    async fn try_once(&self, url: &str) -> Result<String, String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(describe_request_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("HTTP {}", status.as_u16()));
        }

        response.text().await.map_err(describe_request_error)
    }
}

/// Classifies a reqwest failure into a short cause string
fn describe_request_error(e: reqwest::Error) -> String {
    if e.is_timeout() {
        "Request timeout".to_string()
    } else if e.is_connect() {
        format!("Connection failed: {}", e)
    } else {
        e.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_config() -> UserAgentConfig {
        UserAgentConfig {
            crawler_name: "TestCrawler".to_string(),
            crawler_version: "1.0".to_string(),
            contact_url: "https://example.com/about".to_string(),
            contact_email: "admin@example.com".to_string(),
        }
    }

    fn policy(max_retries: u32) -> FetchPolicy {
        FetchPolicy {
            request_delay: Duration::from_millis(1),
            jitter: Duration::ZERO,
            timeout: Duration::from_secs(5),
            max_retries,
            backoff_base: Duration::from_millis(1),
        }
    }

    #[test]
    fn test_build_http_client() {
        let config = create_test_config();
        let client = build_http_client(&config, Duration::from_secs(30));
        assert!(client.is_ok());
    }

    #[test]
    fn test_backoff_doubles_from_attempt_zero() {
        let policy = FetchPolicy {
            backoff_base: Duration::from_secs(1),
            ..policy(3)
        };

        assert_eq!(policy.backoff(0), Duration::from_secs(1));
        assert_eq!(policy.backoff(1), Duration::from_secs(2));
        assert_eq!(policy.backoff(2), Duration::from_secs(4));
        assert_eq!(policy.max_attempts(), 4);
    }

    #[test]
    fn test_pacing_delay_stays_in_range() {
        let policy = FetchPolicy {
            request_delay: Duration::from_millis(100),
            jitter: Duration::from_millis(50),
            ..policy(0)
        };

        for _ in 0..100 {
            let delay = policy.pacing_delay();
            assert!(delay >= Duration::from_millis(100));
            assert!(delay < Duration::from_millis(150));
        }
    }

    #[test]
    fn test_policy_from_config_defaults() {
        let policy = FetchPolicy::default();
        assert_eq!(policy.request_delay, Duration::from_secs(1));
        assert_eq!(policy.jitter, Duration::from_secs(1));
        assert_eq!(policy.timeout, Duration::from_secs(30));
        assert_eq!(policy.max_retries, 3);
    }

    #[tokio::test]
    async fn test_unreachable_host_uses_every_attempt() {
        let client = build_http_client(&create_test_config(), Duration::from_secs(2)).unwrap();
        let fetcher = FetchClient::new(client, policy(2));

        // Port 9 on loopback refuses connections
        let err = fetcher.fetch("http://127.0.0.1:9/").await.unwrap_err();

        assert_eq!(err.attempts, 3);
        assert_eq!(err.url, "http://127.0.0.1:9/");
        assert!(!err.cause.is_empty());
    }
}
