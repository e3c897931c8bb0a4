use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - database.url is not empty
/// - dispatch.sleep_time is a finite, non-negative number of seconds
/// - dispatch.query_timeout is a finite, positive number of seconds
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.database.url.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "database.url cannot be empty".to_string(),
        ));
    }

    let sleep_time = config.dispatch.sleep_time;
    if !sleep_time.is_finite() || sleep_time < 0.0 {
        return Err(ConfigError::ValidationError(format!(
            "dispatch.sleep_time must be >= 0, got {}",
            sleep_time
        )));
    }

    let query_timeout = config.dispatch.query_timeout;
    if !query_timeout.is_finite() || query_timeout <= 0.0 {
        return Err(ConfigError::ValidationError(format!(
            "dispatch.query_timeout must be > 0, got {}",
            query_timeout
        )));
    }

    Ok(())
}
