use crate::config::types::{Config, CrawlerConfig, MemoryConfig, OutputConfig, UserAgentConfig};
use crate::ConfigError;
use url::Url;

/// Highest accepted value for `max-concurrent`
const MAX_CONCURRENCY: usize = 256;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_memory_config(&config.memory)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_concurrent < 1 || config.max_concurrent > MAX_CONCURRENCY {
        return Err(ConfigError::Validation(format!(
            "max_concurrent must be between 1 and {}, got {}",
            MAX_CONCURRENCY, config.max_concurrent
        )));
    }

    if config.max_retries < 1 {
        return Err(ConfigError::Validation(
            "max_retries must be >= 1".to_string(),
        ));
    }

    if config.seeds.is_empty() {
        return Err(ConfigError::Validation(
            "at least one seed URL is required".to_string(),
        ));
    }

    for seed in &config.seeds {
        validate_seed(seed)?;
    }

    Ok(())
}

/// Seeds must be absolute http(s) URLs with a host
fn validate_seed(seed: &str) -> Result<(), ConfigError> {
    let url = Url::parse(seed)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid seed URL '{}': {}", seed, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "Seed URL '{}' must use http or https",
            seed
        )));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "Seed URL '{}' has no host",
            seed
        )));
    }

    Ok(())
}

fn validate_memory_config(config: &MemoryConfig) -> Result<(), ConfigError> {
    if let Some(threshold) = config.threshold_percent {
        if !(threshold > 0.0 && threshold <= 100.0) {
            return Err(ConfigError::Validation(format!(
                "memory threshold_percent must be in (0, 100], got {}",
                threshold
            )));
        }
    }

    if config.check_interval_ms == 0 {
        return Err(ConfigError::Validation(
            "memory check_interval_ms must be > 0".to_string(),
        ));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only ASCII letters, digits and hyphens, got '{}'",
            config.crawler_name
        )));
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

    if config.docs_directory.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "docs_directory cannot be empty".to_string(),
        ));
    }

    if config.link_map.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "link_map cannot be empty".to_string(),
        ));
    }

    Ok(())
}
