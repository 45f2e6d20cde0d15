//! Session configuration.

use std::time::Duration;

/// Default cadence of the match-state poll.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(3000);

/// Shortest poll interval accepted.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Opponent used for quick matches.
pub const BOT_OPPONENT: &str = "bot_player";

/// Session actor configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Period between scheduled state fetches
    pub poll_interval: Duration,

    /// Capacity of the update channel towards the presentation layer
    pub update_capacity: usize,

    /// Capacity of the command inbox
    pub inbox_capacity: usize,

    /// Opponent identity used by quick matches
    pub bot_opponent: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            update_capacity: 64,
            inbox_capacity: 32,
            bot_opponent: BOT_OPPONENT.to_string(),
        }
    }
}

impl SessionConfig {
    /// Config with a custom poll interval and defaults elsewhere.
    pub fn with_poll_interval(poll_interval: Duration) -> Self {
        Self {
            poll_interval,
            ..Self::default()
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.poll_interval < MIN_POLL_INTERVAL {
            return Err(format!(
                "Poll interval must be at least {} ms",
                MIN_POLL_INTERVAL.as_millis()
            ));
        }

        if self.update_capacity == 0 || self.inbox_capacity == 0 {
            return Err("Channel capacities must be greater than 0".to_string());
        }

        if self.bot_opponent.trim().is_empty() {
            return Err("Bot opponent name must not be empty".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = SessionConfig::default();
        assert_eq!(config.poll_interval, Duration::from_secs(3));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_poll_interval_too_short() {
        let config = SessionConfig::with_poll_interval(Duration::from_millis(10));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_capacity() {
        let config = SessionConfig {
            update_capacity: 0,
            ..SessionConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
