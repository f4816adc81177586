//! Host configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.
//! CLI flags override environment variables, which override defaults.

use hilo::{RoundRules, TableConfig, round::constants::DEFAULT_FINISH_TIMEOUT_MS};
use std::{net::SocketAddr, time::Duration};

/// Default bind address
pub const DEFAULT_BIND: &str = "0.0.0.0:8080";

/// Default tick interval in milliseconds
pub const DEFAULT_TICK_MS: u64 = 500;

/// Default subscriber channel capacity
pub const DEFAULT_SUBSCRIBER_BUFFER: usize = 32;

/// Complete host configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostConfig {
    /// HTTP/WebSocket bind address
    pub bind: SocketAddr,
    /// Interval between finish-timeout checks
    pub tick_interval: Duration,
    /// How long a finished round stays up, in milliseconds
    pub finish_timeout_ms: i64,
    /// Per-connection state channel capacity
    pub subscriber_buffer: usize,
    /// Offer TIE as a third side
    pub tie_enabled: bool,
    /// Prometheus exporter address; no exporter when unset
    pub metrics_bind: Option<SocketAddr>,
}

/// Values given on the command line. `None` falls through to the environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub bind: Option<SocketAddr>,
    pub tick_ms: Option<u64>,
    pub finish_timeout_ms: Option<i64>,
    pub tie_enabled: bool,
    pub metrics_bind: Option<SocketAddr>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 8080)),
            tick_interval: Duration::from_millis(DEFAULT_TICK_MS),
            finish_timeout_ms: DEFAULT_FINISH_TIMEOUT_MS,
            subscriber_buffer: DEFAULT_SUBSCRIBER_BUFFER,
            tie_enabled: false,
            metrics_bind: None,
        }
    }
}

impl HostConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns error if an address variable is set but unparsable
    pub fn from_env(overrides: ConfigOverrides) -> Result<Self, ConfigError> {
        Self::from_vars(overrides, |key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source
    ///
    /// # Errors
    ///
    /// Returns error if an address variable is set but unparsable
    pub fn from_vars(
        overrides: ConfigOverrides,
        vars: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let bind = match overrides.bind {
            Some(bind) => bind,
            None => parse_addr(&vars, "HILO_BIND")?
                .unwrap_or(SocketAddr::from(([0, 0, 0, 0], 8080))),
        };

        let metrics_bind = match overrides.metrics_bind {
            Some(addr) => Some(addr),
            None => parse_addr(&vars, "HILO_METRICS_BIND")?,
        };

        let tick_ms = overrides
            .tick_ms
            .unwrap_or_else(|| parse_or(&vars, "HILO_TICK_MS", DEFAULT_TICK_MS));

        let finish_timeout_ms = overrides.finish_timeout_ms.unwrap_or_else(|| {
            parse_or(&vars, "HILO_FINISH_TIMEOUT_MS", DEFAULT_FINISH_TIMEOUT_MS)
        });

        let tie_enabled = overrides.tie_enabled || parse_or(&vars, "HILO_TIE_ENABLED", false);

        Ok(HostConfig {
            bind,
            tick_interval: Duration::from_millis(tick_ms),
            finish_timeout_ms,
            subscriber_buffer: parse_or(&vars, "HILO_SUBSCRIBER_BUFFER", DEFAULT_SUBSCRIBER_BUFFER),
            tie_enabled,
            metrics_bind,
        })
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval.is_zero() {
            return Err(ConfigError::Invalid {
                var: "HILO_TICK_MS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.finish_timeout_ms <= 0 {
            return Err(ConfigError::Invalid {
                var: "HILO_FINISH_TIMEOUT_MS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.subscriber_buffer == 0 {
            return Err(ConfigError::Invalid {
                var: "HILO_SUBSCRIBER_BUFFER".to_string(),
                reason: "Must be at least 1".to_string(),
            });
        }

        if let Some(metrics_bind) = self.metrics_bind
            && metrics_bind == self.bind
            && metrics_bind.port() != 0
        {
            return Err(ConfigError::Invalid {
                var: "HILO_METRICS_BIND".to_string(),
                reason: format!("Must differ from the server bind address ({})", self.bind),
            });
        }

        self.table_config()
            .validate()
            .map_err(|reason| ConfigError::Invalid {
                var: "table".to_string(),
                reason,
            })
    }

    /// Table actor settings derived from this configuration
    pub fn table_config(&self) -> TableConfig {
        TableConfig {
            tick_interval: self.tick_interval,
            rules: RoundRules {
                finish_timeout_ms: self.finish_timeout_ms,
                tie_enabled: self.tie_enabled,
            },
            subscriber_buffer: self.subscriber_buffer,
            ..TableConfig::default()
        }
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

fn parse_addr(
    vars: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<SocketAddr>, ConfigError> {
    vars(key)
        .map(|value| {
            value.parse().map_err(|_| ConfigError::Invalid {
                var: key.to_string(),
                reason: format!("'{value}' is not an IP:PORT address"),
            })
        })
        .transpose()
}

/// Helper to parse a variable with default fallback
fn parse_or<T>(vars: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    vars(key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = HostConfig::from_vars(ConfigOverrides::default(), vars(&[])).unwrap();
        assert_eq!(config, HostConfig::default());
        assert_eq!(config.bind.to_string(), DEFAULT_BIND);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_values() {
        let config = HostConfig::from_vars(
            ConfigOverrides::default(),
            vars(&[
                ("HILO_BIND", "127.0.0.1:9000"),
                ("HILO_TICK_MS", "250"),
                ("HILO_FINISH_TIMEOUT_MS", "3000"),
                ("HILO_SUBSCRIBER_BUFFER", "8"),
                ("HILO_TIE_ENABLED", "true"),
                ("HILO_METRICS_BIND", "127.0.0.1:9100"),
            ]),
        )
        .unwrap();
        assert_eq!(config.bind.port(), 9000);
        assert_eq!(config.tick_interval, Duration::from_millis(250));
        assert_eq!(config.finish_timeout_ms, 3000);
        assert_eq!(config.subscriber_buffer, 8);
        assert!(config.tie_enabled);
        assert_eq!(config.metrics_bind.map(|a| a.port()), Some(9100));

        let table = config.table_config();
        assert_eq!(table.rules.finish_timeout_ms, 3000);
        assert!(table.rules.tie_enabled);
        assert_eq!(table.subscriber_buffer, 8);
    }

    #[test]
    fn test_overrides_win() {
        let overrides = ConfigOverrides {
            bind: Some("127.0.0.1:7000".parse().unwrap()),
            tick_ms: Some(100),
            ..ConfigOverrides::default()
        };
        let config = HostConfig::from_vars(
            overrides,
            vars(&[("HILO_BIND", "127.0.0.1:9000"), ("HILO_TICK_MS", "250")]),
        )
        .unwrap();
        assert_eq!(config.bind.port(), 7000);
        assert_eq!(config.tick_interval, Duration::from_millis(100));
    }

    #[test]
    fn test_bad_bind_is_an_error() {
        let err = HostConfig::from_vars(
            ConfigOverrides::default(),
            vars(&[("HILO_BIND", "localhost")]),
        )
        .unwrap_err();
        assert!(err.to_string().contains("HILO_BIND"));
    }

    #[test]
    fn test_validation_rejects_zero_values() {
        let config = HostConfig {
            tick_interval: Duration::ZERO,
            ..HostConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { var, .. }) if var == "HILO_TICK_MS"
        ));

        let config = HostConfig {
            finish_timeout_ms: 0,
            ..HostConfig::default()
        };
        assert!(config.validate().is_err());

        let config = HostConfig {
            subscriber_buffer: 0,
            ..HostConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
