use crate::config::types::{Config, CrawlerConfig, DownloadConfig, HttpConfig, OutputConfig};
use crate::ConfigError;
use reqwest::header::{HeaderName, HeaderValue};
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_http_config(&config.http)?;
    validate_download_config(&config.download)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates traversal configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    // max_depth and delay_ms are unsigned, any value is usable
    if config.delay_ms > 60 * 60 * 1000 {
        return Err(ConfigError::Validation(format!(
            "delay must be at most one hour, got {}ms",
            config.delay_ms
        )));
    }

    Ok(())
}

/// Validates HTTP client configuration
fn validate_http_config(config: &HttpConfig) -> Result<(), ConfigError> {
    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "timeout must be at least 1 second".to_string(),
        ));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    HeaderValue::from_str(&config.user_agent).map_err(|_| {
        ConfigError::Validation(format!("Invalid user agent '{}'", config.user_agent))
    })?;

    for (name, value) in &config.headers {
        HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| ConfigError::Validation(format!("Invalid header name '{}'", name)))?;
        HeaderValue::from_str(value).map_err(|_| {
            ConfigError::Validation(format!("Invalid value for header '{}'", name))
        })?;
    }

    if let Some(cookies) = &config.cookies {
        HeaderValue::from_str(cookies)
            .map_err(|_| ConfigError::Validation("Invalid cookie string".to_string()))?;
    }

    if let Some(proxy) = &config.proxy {
        Url::parse(proxy)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid proxy '{}': {}", proxy, e)))?;
    }

    Ok(())
}

/// Validates download configuration
fn validate_download_config(config: &DownloadConfig) -> Result<(), ConfigError> {
    if config.workers < 1 || config.workers > 64 {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and 64, got {}",
            config.workers
        )));
    }

    if config.retries > 20 {
        return Err(ConfigError::Validation(format!(
            "retries must be at most 20, got {}",
            config.retries
        )));
    }

    if config.max_file_size == Some(0) {
        return Err(ConfigError::Validation(
            "max_file_size must be greater than zero".to_string(),
        ));
    }

    for ext in config.include_types.iter().chain(&config.exclude_types) {
        validate_extension(ext)?;
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.directory.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "output directory cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates a normalized extension such as `.png`
fn validate_extension(ext: &str) -> Result<(), ConfigError> {
    let Some(body) = ext.strip_prefix('.') else {
        return Err(ConfigError::Validation(format!(
            "Extension '{}' must start with '.'",
            ext
        )));
    };

    if body.is_empty() || !body.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "Extension '{}' contains invalid characters",
            ext
        )));
    }

    Ok(())
}
