use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Upload limit is not 0
/// - Lafzize endpoint is an http(s) URL
/// - Session lifetime is not 0
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.storage.max_upload_bytes == 0 {
        return Err(ConfigError::ValidationError(
            "storage.max_upload_bytes cannot be 0".to_string(),
        ));
    }

    if config.auth.session_ttl_hours == 0 {
        return Err(ConfigError::ValidationError(
            "auth.session_ttl_hours cannot be 0".to_string(),
        ));
    }

    let endpoint = reqwest::Url::parse(&config.lafzize.endpoint).map_err(|e| {
        ConfigError::ValidationError(format!(
            "lafzize.endpoint '{}' is not a valid URL: {}",
            config.lafzize.endpoint, e
        ))
    })?;
    if !matches!(endpoint.scheme(), "http" | "https") {
        return Err(ConfigError::ValidationError(format!(
            "lafzize.endpoint must use http or https, got '{}'",
            endpoint.scheme()
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_port_zero_fails() {
        let mut config = Config::default();
        config.server.port = 0;
        let result = validate_config(&config);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_validate_zero_upload_limit_fails() {
        let mut config = Config::default();
        config.storage.max_upload_bytes = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_bad_endpoint_fails() {
        let mut config = Config::default();
        config.lafzize.endpoint = "not a url".to_string();
        assert!(validate_config(&config).is_err());

        config.lafzize.endpoint = "ftp://aligner/lafzize".to_string();
        assert!(validate_config(&config).is_err());
    }
}
