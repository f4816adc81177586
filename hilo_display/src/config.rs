//! Display configuration.
//!
//! CLI flags override environment variables, which override defaults.

use std::time::Duration;

/// Default host name or address
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default host port
pub const DEFAULT_PORT: u16 = 8080;

/// Default table number announced in HELLO
pub const DEFAULT_TABLE_ID: u32 = 1;

/// First reconnect delay
pub const DEFAULT_BACKOFF_INITIAL: Duration = Duration::from_millis(500);

/// Upper bound on the reconnect delay
pub const DEFAULT_BACKOFF_MAX: Duration = Duration::from_secs(5);

/// What to do after the connection drops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectPolicy {
    /// Stay disconnected.
    Never,
    /// Retry, doubling the delay from `initial` up to `max`.
    Backoff { initial: Duration, max: Duration },
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::Backoff {
            initial: DEFAULT_BACKOFF_INITIAL,
            max: DEFAULT_BACKOFF_MAX,
        }
    }
}

impl ReconnectPolicy {
    /// Delay before attempt number `attempt` (0-based), or `None` when no
    /// retry should happen.
    pub fn delay(&self, attempt: u32) -> Option<Duration> {
        match *self {
            Self::Never => None,
            Self::Backoff { initial, max } => {
                let factor = 1u32.checked_shl(attempt.min(16)).unwrap_or(u32::MAX);
                Some(initial.saturating_mul(factor).min(max))
            }
        }
    }
}

/// Complete display configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayConfig {
    pub host: String,
    pub port: u16,
    pub table_id: u32,
    /// Sent in HELLO so the host can tell devices apart in its logs
    pub device_id: String,
    pub reconnect: ReconnectPolicy,
}

/// Values given on the command line. `None` falls through to the environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub table_id: Option<u32>,
    pub device_id: Option<String>,
    pub no_reconnect: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            table_id: DEFAULT_TABLE_ID,
            device_id: uuid::Uuid::new_v4().to_string(),
            reconnect: ReconnectPolicy::default(),
        }
    }
}

impl DisplayConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns error if a numeric variable is set but unparsable
    pub fn from_env(overrides: ConfigOverrides) -> Result<Self, ConfigError> {
        Self::from_vars(overrides, |key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source
    ///
    /// # Errors
    ///
    /// Returns error if a numeric variable is set but unparsable
    pub fn from_vars(
        overrides: ConfigOverrides,
        vars: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let host = overrides
            .host
            .or_else(|| vars("HILO_HOST"))
            .unwrap_or_else(|| DEFAULT_HOST.to_string());

        let port = match overrides.port {
            Some(port) => port,
            None => parse_strict(&vars, "HILO_PORT")?.unwrap_or(DEFAULT_PORT),
        };

        let table_id = match overrides.table_id {
            Some(table_id) => table_id,
            None => parse_strict(&vars, "HILO_TABLE_ID")?.unwrap_or(DEFAULT_TABLE_ID),
        };

        let device_id = overrides
            .device_id
            .or_else(|| vars("HILO_DEVICE_ID"))
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let reconnect = if overrides.no_reconnect {
            ReconnectPolicy::Never
        } else {
            ReconnectPolicy::default()
        };

        Ok(DisplayConfig {
            host,
            port,
            table_id,
            device_id,
            reconnect,
        })
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::Invalid {
                var: "HILO_HOST".to_string(),
                reason: "Must not be empty".to_string(),
            });
        }

        if self.port == 0 {
            return Err(ConfigError::Invalid {
                var: "HILO_PORT".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if let ReconnectPolicy::Backoff { initial, .. } = self.reconnect
            && initial.is_zero()
        {
            return Err(ConfigError::Invalid {
                var: "reconnect".to_string(),
                reason: "Backoff must start above 0".to_string(),
            });
        }

        Ok(())
    }

    /// `ws://host:port/ws`
    pub fn ws_url(&self) -> String {
        format!("ws://{}:{}/ws", self.host, self.port)
    }

    /// `http://host:port`
    pub fn http_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

fn parse_strict<T>(
    vars: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
{
    vars(key)
        .map(|value| {
            value.trim().parse().map_err(|_| ConfigError::Invalid {
                var: key.to_string(),
                reason: format!("'{value}' is not a number"),
            })
        })
        .transpose()
}
