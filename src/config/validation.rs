use crate::config::types::{
    Config, CrawlerConfig, RequestLimit, StorageConfig, MAX_PERIOD_SECONDS,
};
use std::time::Duration;
use crate::ConfigError;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_request_limit(&config.request_limit)?;
    validate_storage_config(&config.storage)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    // max_retries >= 0 is always true for u32

    if config.concurrency < 1 {
        return Err(ConfigError::Validation(format!(
            "concurrency must be greater than 0, got {}",
            config.concurrency
        )));
    }

    if config.navigation_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "navigation_timeout_secs must be >= 1".to_string(),
        ));
    }

    validate_user_agent(&config.user_agent)?;

    Ok(())
}

/// Validates the shared request limit
fn validate_request_limit(limit: &RequestLimit) -> Result<(), ConfigError> {
    if limit.max_requests < 1 {
        return Err(ConfigError::Validation(format!(
            "max_requests must be >= 1, got {}",
            limit.max_requests
        )));
    }

    if !limit.period_seconds.is_finite() || limit.period_seconds <= 0.0 {
        return Err(ConfigError::Validation(format!(
            "period_seconds must be a positive number, got {}",
            limit.period_seconds
        )));
    }

    if limit.period_seconds > MAX_PERIOD_SECONDS
        || Duration::try_from_secs_f64(limit.period_seconds).is_err()
    {
        return Err(ConfigError::Validation(format!(
            "period_seconds must be at most {}, got {}",
            MAX_PERIOD_SECONDS, limit.period_seconds
        )));
    }

    Ok(())
}

/// Validates storage configuration
fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.data_dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "data_dir cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// User agents end up in an HTTP header, so no control characters
fn validate_user_agent(user_agent: &str) -> Result<(), ConfigError> {
    if user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if user_agent.chars().any(|c| c.is_control()) {
        return Err(ConfigError::Validation(format!(
            "user_agent must not contain control characters, got {:?}",
            user_agent
        )));
    }

    Ok(())
}
