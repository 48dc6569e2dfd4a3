use super::{types::Config, AuthMethod, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - api_key auth carries a non-empty key
/// - Stats cache TTL is not 0
/// - Default location name is not blank and the hierarchy cap is positive
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.auth.method == AuthMethod::ApiKey
        && config.auth.api_key.as_deref().is_none_or(str::is_empty)
    {
        return Err(ConfigError::ValidationError(
            "auth.api_key must be set when auth.method = \"api_key\"".to_string(),
        ));
    }

    if config.stats.cache_ttl_secs == 0 {
        return Err(ConfigError::ValidationError(
            "stats.cache_ttl_secs cannot be 0".to_string(),
        ));
    }

    if config.locations.default_name.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "locations.default_name cannot be empty".to_string(),
        ));
    }

    if config.locations.max_depth == 0 {
        return Err(ConfigError::ValidationError(
            "locations.max_depth cannot be 0".to_string(),
        ));
    }

    Ok(())
}
