//! Client configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use escoba::session::{DEFAULT_POLL_INTERVAL, SessionConfig};
use std::time::Duration;

/// Default address of the API gateway
pub const DEFAULT_SERVER_URL: &str = "http://localhost:5000";

/// Default route prefix of the match authority behind the gateway
pub const DEFAULT_MATCH_PREFIX: &str = "/matches/matches";

/// Complete client configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API gateway base URL
    pub server_url: String,
    /// Route prefix of the match endpoints
    pub match_prefix: String,
    /// Period between scheduled state fetches
    pub poll_interval: Duration,
    /// Per-request timeout
    pub request_timeout: Duration,
    /// Login name, prompted for when absent
    pub username: Option<String>,
    /// Login password, prompted for when absent
    pub password: Option<String>,
}

/// Command line overrides, applied on top of the environment
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub server_url: Option<String>,
    pub poll_interval_ms: Option<u64>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl ClientConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns error if a variable is set but can't be parsed
    pub fn from_env(overrides: Overrides) -> Result<Self, ConfigError> {
        let server_url = overrides
            .server_url
            .or_else(|| std::env::var("ESCOBA_SERVER_URL").ok())
            .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string());

        let match_prefix = std::env::var("ESCOBA_MATCH_PREFIX")
            .unwrap_or_else(|_| DEFAULT_MATCH_PREFIX.to_string());

        let poll_interval_ms = match overrides.poll_interval_ms {
            Some(ms) => ms,
            None => parse_env_or(
                "ESCOBA_POLL_INTERVAL_MS",
                DEFAULT_POLL_INTERVAL.as_millis() as u64,
            )?,
        };

        let request_timeout_secs = parse_env_or("ESCOBA_REQUEST_TIMEOUT_SECS", 10u64)?;

        Ok(ClientConfig {
            server_url: server_url.trim_end_matches('/').to_string(),
            match_prefix,
            poll_interval: Duration::from_millis(poll_interval_ms),
            request_timeout: Duration::from_secs(request_timeout_secs),
            username: overrides
                .username
                .or_else(|| std::env::var("ESCOBA_USERNAME").ok()),
            password: overrides
                .password
                .or_else(|| std::env::var("ESCOBA_PASSWORD").ok()),
        })
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.server_url.starts_with("http://") || self.server_url.starts_with("https://")) {
            return Err(ConfigError::Invalid {
                var: "ESCOBA_SERVER_URL".to_string(),
                reason: format!("Must start with http:// or https://, got '{}'", self.server_url),
            });
        }

        if !self.match_prefix.starts_with('/') {
            return Err(ConfigError::Invalid {
                var: "ESCOBA_MATCH_PREFIX".to_string(),
                reason: "Must start with '/'".to_string(),
            });
        }

        let poll_ms = self.poll_interval.as_millis();
        if !(250..=60_000).contains(&poll_ms) {
            return Err(ConfigError::Invalid {
                var: "ESCOBA_POLL_INTERVAL_MS".to_string(),
                reason: format!("Must be between 250 and 60000, got {poll_ms}"),
            });
        }

        let timeout_secs = self.request_timeout.as_secs();
        if !(1..=120).contains(&timeout_secs) {
            return Err(ConfigError::Invalid {
                var: "ESCOBA_REQUEST_TIMEOUT_SECS".to_string(),
                reason: format!("Must be between 1 and 120, got {timeout_secs}"),
            });
        }

        Ok(())
    }

    /// The configured password, or the one `prompt` returns.
    pub fn password_or(
        &self,
        prompt: impl FnOnce() -> Option<String>,
    ) -> Result<String, ConfigError> {
        self.password
            .clone()
            .or_else(prompt)
            .filter(|password| !password.is_empty())
            .ok_or_else(|| ConfigError::MissingRequired {
                var: "ESCOBA_PASSWORD".to_string(),
                hint: "Set it in .env or pass --password".to_string(),
            })
    }

    /// Session settings derived from this configuration
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig::with_poll_interval(self.poll_interval)
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {var}\nHint: {hint}")]
    MissingRequired { var: String, hint: String },

    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Helper to parse environment variable with default fallback
fn parse_env_or<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var: key.to_string(),
            reason: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}
