use crate::config::types::{Config, PipelineConfig, ServerConfig, StorageConfig, UserAgentConfig};
use crate::ConfigError;
use std::net::SocketAddr;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_server_config(&config.server)?;
    validate_pipeline_config(&config.pipeline)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_storage_config(&config.storage)?;
    Ok(())
}

fn validate_server_config(config: &ServerConfig) -> Result<(), ConfigError> {
    config
        .listen_addr
        .parse::<SocketAddr>()
        .map_err(|e| ConfigError::InvalidAddr(format!("'{}': {}", config.listen_addr, e)))?;
    Ok(())
}

/// Validates pipeline configuration
fn validate_pipeline_config(config: &PipelineConfig) -> Result<(), ConfigError> {
    if config.max_active < 1 || config.max_active > 1000 {
        return Err(ConfigError::Validation(format!(
            "max_active must be between 1 and 1000, got {}",
            config.max_active
        )));
    }

    if config.poll_interval_ms < 10 {
        return Err(ConfigError::Validation(format!(
            "poll_interval_ms must be >= 10ms, got {}ms",
            config.poll_interval_ms
        )));
    }

    if config.extraction_workers < 1 || config.extraction_workers > 64 {
        return Err(ConfigError::Validation(format!(
            "extraction_workers must be between 1 and 64, got {}",
            config.extraction_workers
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Validate client name: non-empty, alphanumeric + hyphens only
    if config.client_name.is_empty() {
        return Err(ConfigError::Validation(
            "client_name cannot be empty".to_string(),
        ));
    }

    if !config
        .client_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "client_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.client_name
        )));
    }

    if config.client_version.trim().is_empty() {
        return Err(ConfigError::Validation(
            "client_version cannot be empty".to_string(),
        ));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "request_timeout_secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.image_dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "image_dir cannot be empty".to_string(),
        ));
    }
    Ok(())
}
