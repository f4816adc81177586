//! Table configuration models.

use std::time::Duration;

use crate::round::RoundRules;

/// Default interval between finish-timeout checks.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(500);

/// Default capacity of each subscriber channel.
pub const DEFAULT_SUBSCRIBER_BUFFER: usize = 32;

/// Default capacity of the actor inbox.
pub const DEFAULT_INBOX_CAPACITY: usize = 100;

/// Table configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableConfig {
    /// Name used in log lines
    pub name: String,

    /// How often the actor checks the finish timeout
    pub tick_interval: Duration,

    /// Round rules handed to the engine
    pub rules: RoundRules,

    /// Per-subscriber channel capacity; deliveries beyond it are dropped
    pub subscriber_buffer: usize,

    /// Actor inbox capacity
    pub inbox_capacity: usize,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            name: "main".to_string(),
            tick_interval: DEFAULT_TICK_INTERVAL,
            rules: RoundRules::default(),
            subscriber_buffer: DEFAULT_SUBSCRIBER_BUFFER,
            inbox_capacity: DEFAULT_INBOX_CAPACITY,
        }
    }
}

impl TableConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.tick_interval.is_zero() {
            return Err("Tick interval must be greater than zero".to_string());
        }

        if self.rules.finish_timeout_ms <= 0 {
            return Err("Finish timeout must be greater than zero".to_string());
        }

        if self.subscriber_buffer == 0 {
            return Err("Subscriber buffer must be at least 1".to_string());
        }

        if self.inbox_capacity == 0 {
            return Err("Inbox capacity must be at least 1".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = TableConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.tick_interval, Duration::from_millis(500));
        assert_eq!(config.rules.finish_timeout_ms, 10_000);
        assert!(!config.rules.tie_enabled);
    }

    #[test]
    fn test_rejects_zero_values() {
        let config = TableConfig {
            tick_interval: Duration::ZERO,
            ..TableConfig::default()
        };
        assert!(config.validate().is_err());

        let config = TableConfig {
            subscriber_buffer: 0,
            ..TableConfig::default()
        };
        assert!(config.validate().is_err());

        let mut config = TableConfig::default();
        config.rules.finish_timeout_ms = 0;
        assert!(config.validate().is_err());
    }
}
