use crate::config::types::{ApiConfig, ExportConfig, PollerConfig, Settings};
use crate::export::ExportCategory;
use crate::ConfigError;
use url::Url;

/// Validates the entire settings structure
pub fn validate(settings: &Settings) -> Result<(), ConfigError> {
    validate_api_config(&settings.api)?;
    validate_poller_config(&settings.poller)?;
    validate_export_config(&settings.exports)?;
    Ok(())
}

/// Validates the remote endpoint configuration
fn validate_api_config(config: &ApiConfig) -> Result<(), ConfigError> {
    if config.base_url.trim().is_empty() {
        return Err(ConfigError::Validation(
            "base_url cannot be empty".to_string(),
        ));
    }

    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url must use http or https, got '{}'",
            url.scheme()
        )));
    }

    if config.timeout_secs < 1 || config.timeout_secs > 3_600 {
        return Err(ConfigError::Validation(format!(
            "timeout_secs must be between 1 and 3600, got {}",
            config.timeout_secs
        )));
    }

    Ok(())
}

/// Validates poller limits
fn validate_poller_config(config: &PollerConfig) -> Result<(), ConfigError> {
    if config.poll_interval_ms < 1 {
        return Err(ConfigError::Validation(
            "poll_interval_ms must be >= 1".to_string(),
        ));
    }

    if config.max_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "max_attempts must be >= 1, got {}",
            config.max_attempts
        )));
    }

    Ok(())
}

/// Validates the export directory layout
fn validate_export_config(config: &ExportConfig) -> Result<(), ConfigError> {
    if config.root_dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "export root_dir cannot be empty".to_string(),
        ));
    }

    for (name, dir) in &config.directories {
        if ExportCategory::from_name(name).is_none() {
            return Err(ConfigError::Validation(format!(
                "Unknown export category '{}' in directories",
                name
            )));
        }
        if dir.as_os_str().is_empty() {
            return Err(ConfigError::Validation(format!(
                "Directory for category '{}' cannot be empty",
                name
            )));
        }
    }

    Ok(())
}
