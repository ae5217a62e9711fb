//! Configuration file structures for the BattleMetrics client.
//!
//! The configuration is read from a YAML file and can be overridden with
//! environment variables prefixed with `BATTLEMETRICS_`, nested keys being
//! separated by a double underscore.
//!
//! # Configuration File Format
//!
//! ```yaml
//! api:
//!   # BattleMetrics API token
//!   token: "your-token"
//!   # API base URL (optional)
//!   base_url: "https://api.battlemetrics.com"
//!   # Per-request timeout in seconds (optional)
//!   timeout: 30
//!
//! # Rate limit handling (optional)
//! retry:
//!   max_retries: 5
//!   # Seconds waited after the first 429
//!   cooldown: 30
//!   # fixed or exponential
//!   backoff: fixed
//!   # Upper bound of a single wait, in seconds
//!   max_delay: 300
//! ```
//!
//! ```bash
//! export BATTLEMETRICS_API__TOKEN="token-from-env"
//! export BATTLEMETRICS_RETRY__MAX_RETRIES=2
//! ```

use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Yaml};
use serde::Deserialize;

use crate::client::Battlemetrics;
use crate::error::Result;
use crate::http::{Backoff, DEFAULT_BASE_URL, HttpTransport, RetryPolicy};

/// Prefix of the environment variables overriding the file.
pub const ENV_PREFIX: &str = "BATTLEMETRICS_";

/// Root configuration structure.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Config {
    /// API access
    pub api: ApiConfig,
    /// Rate limit handling
    #[serde(default)]
    pub retry: RetryConfig,
}

/// API access settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ApiConfig {
    /// BattleMetrics API token.
    pub token: String,

    /// Base URL of the API.
    ///
    /// Only useful to point the client at a proxy or a test server.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds. No timeout when unset.
    #[serde(default)]
    pub timeout: Option<u64>,
}

/// Rate limit retry settings, see [`RetryPolicy`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    /// Seconds.
    pub cooldown: u64,
    pub backoff: Backoff,
    /// Seconds.
    pub max_delay: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        RetryConfig {
            max_retries: policy.max_retries,
            cooldown: policy.cooldown.as_secs(),
            backoff: policy.backoff,
            max_delay: policy.max_delay.as_secs(),
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        RetryPolicy::default()
            .with_max_retries(config.max_retries)
            .with_cooldown(Duration::from_secs(config.cooldown))
            .with_backoff(config.backoff)
            .with_max_delay(Duration::from_secs(config.max_delay))
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_owned()
}

impl Config {
    /// Load the configuration from a YAML file merged with the
    /// `BATTLEMETRICS_` environment variables.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use battlemetrics::config::Config;
    ///
    /// let config = Config::load("battlemetrics.yaml").unwrap();
    /// println!("API: {}", config.api.base_url);
    /// ```
    pub fn load(path: &str) -> std::result::Result<Config, figment::Error> {
        Figment::new()
            .merge(Yaml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
    }

    /// Build a client from this configuration.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`](crate::Error::InvalidArgument) if the
    /// token is empty.
    pub fn client(&self) -> Result<Battlemetrics> {
        let mut transport =
            HttpTransport::new(&self.api.token)?.with_retry_policy(RetryPolicy::from(&self.retry));
        if let Some(timeout) = self.api.timeout {
            transport = transport.with_timeout(Duration::from_secs(timeout));
        }
        Ok(Battlemetrics::from_http(transport, &self.api.base_url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    #[serial]
    fn test_load_with_defaults() {
        let file = write_config("api:\n  token: \"secret\"\n");

        let config = Config::load(file.path().to_str().unwrap()).unwrap();

        assert_eq!(config.api.token, "secret");
        assert_eq!(config.api.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.api.timeout, None);
        assert_eq!(config.retry, RetryConfig::default());
        assert_eq!(config.retry.max_retries, 5);
        assert_eq!(config.retry.cooldown, 30);
    }

    #[test]
    #[serial]
    fn test_load_full_file() {
        let file = write_config(
            "api:\n  token: \"secret\"\n  base_url: \"http://localhost:8080\"\n  timeout: 10\n\
             retry:\n  max_retries: 2\n  cooldown: 5\n  backoff: exponential\n  max_delay: 60\n",
        );

        let config = Config::load(file.path().to_str().unwrap()).unwrap();

        assert_eq!(config.api.base_url, "http://localhost:8080");
        assert_eq!(config.api.timeout, Some(10));
        assert_eq!(
            config.retry,
            RetryConfig {
                max_retries: 2,
                cooldown: 5,
                backoff: Backoff::Exponential,
                max_delay: 60,
            }
        );
    }

    #[test]
    #[serial]
    fn test_env_overrides_file() {
        let file = write_config("api:\n  token: \"from-file\"\nretry:\n  max_retries: 2\n");

        // SAFETY: environment tests are serialized with `#[serial]`
        unsafe {
            std::env::set_var("BATTLEMETRICS_API__TOKEN", "from-env");
            std::env::set_var("BATTLEMETRICS_RETRY__MAX_RETRIES", "7");
        }
        let config = Config::load(file.path().to_str().unwrap());
        unsafe {
            std::env::remove_var("BATTLEMETRICS_API__TOKEN");
            std::env::remove_var("BATTLEMETRICS_RETRY__MAX_RETRIES");
        }

        let config = config.unwrap();
        assert_eq!(config.api.token, "from-env");
        assert_eq!(config.retry.max_retries, 7);
    }

    #[test]
    #[serial]
    fn test_missing_token_is_an_error() {
        let file = write_config("retry:\n  max_retries: 2\n");

        assert!(Config::load(file.path().to_str().unwrap()).is_err());
    }

    #[test]
    #[serial]
    fn test_client_from_config() {
        let file = write_config(
            "api:\n  token: \"secret\"\n  base_url: \"http://localhost:8080/\"\nretry:\n  max_retries: 1\n",
        );
        let config = Config::load(file.path().to_str().unwrap()).unwrap();

        let client = config.client().unwrap();

        assert_eq!(client.base_url(), "http://localhost:8080");
        assert_eq!(client.transport().token(), "secret");
        assert_eq!(client.transport().retry_policy().max_retries, 1);
    }

    #[test]
    #[serial]
    fn test_client_rejects_blank_token() {
        let file = write_config("api:\n  token: \"  \"\n");
        let config = Config::load(file.path().to_str().unwrap()).unwrap();

        assert!(config.client().is_err());
    }
}
