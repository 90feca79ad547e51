use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Tracking intervals are not 0
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.tracking.refresh_interval_secs == 0 {
        return Err(ConfigError::ValidationError(
            "tracking.refresh_interval_secs cannot be 0".to_string(),
        ));
    }

    if config.tracking.tick_interval_secs == 0 {
        return Err(ConfigError::ValidationError(
            "tracking.tick_interval_secs cannot be 0".to_string(),
        ));
    }

    Ok(())
}
