use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub log: LogConfig,
}

/// Connection parameters handed to the connection provider
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Database URL (e.g., "sqlite:lock.db")
    pub url: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub password: String,
}

impl DatabaseConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            user: String::new(),
            password: String::new(),
        }
    }
}

/// Dispatcher timing
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DispatchConfig {
    /// Pause after every command, in seconds (default: 1)
    #[serde(default = "default_sleep_time")]
    pub sleep_time: f64,
    /// Per-statement timeout, in seconds (default: 10)
    #[serde(default = "default_query_timeout")]
    pub query_timeout: f64,
}

impl DispatchConfig {
    /// Only meaningful once [`validate_config`](super::validate_config) passed.
    pub fn pacing(&self) -> Duration {
        seconds(self.sleep_time)
    }

    pub fn query_timeout(&self) -> Duration {
        seconds(self.query_timeout)
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            sleep_time: default_sleep_time(),
            query_timeout: default_query_timeout(),
        }
    }
}

fn seconds(value: f64) -> Duration {
    Duration::try_from_secs_f64(value.max(0.0)).unwrap_or(Duration::MAX)
}

fn default_sleep_time() -> f64 {
    1.0
}

fn default_query_timeout() -> f64 {
    10.0
}

/// Output options for the observational log
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LogConfig {
    /// Prefix every line with the local time it was produced
    #[serde(default)]
    pub timestamps: bool,
    /// Dump metrics to stderr when the run ends
    #[serde(default)]
    pub metrics: bool,
}

/// Sanitized config for diagnostics (password redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub database_url: String,
    pub database_user: String,
    pub password_configured: bool,
    pub dispatch: DispatchConfig,
    pub log: LogConfig,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            database_url: config.database.url.clone(),
            database_user: config.database.user.clone(),
            password_configured: !config.database.password.is_empty(),
            dispatch: config.dispatch.clone(),
            log: config.log.clone(),
        }
    }
}
