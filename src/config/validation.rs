//! Configuration validation.
//!
//! Serde handles syntax; this module checks value ranges and formats.
//! Every problem is reported, not just the first.

use std::net::SocketAddr;

use crate::config::schema::ServerConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("listener.bind_address `{0}` is not a socket address")]
    BindAddress(String),
    #[error("observability.metrics_address `{0}` is not a socket address")]
    MetricsAddress(String),
    #[error("compression.compressible_types must not be empty")]
    NoCompressibleTypes,
    #[error("cache.static_paths entry `{0}` must start with `/`")]
    StaticPath(String),
    #[error("rate_limit.requests must be greater than zero")]
    ZeroRequests,
    #[error("rate_limit.seconds must be greater than zero")]
    ZeroWindow,
    #[error("events.history_limit must be greater than zero")]
    ZeroHistory,
}

/// Validate a parsed configuration.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if config.compression.enabled && config.compression.compressible_types.is_empty() {
        errors.push(ValidationError::NoCompressibleTypes);
    }

    for path in &config.cache.static_paths {
        if !path.starts_with('/') {
            errors.push(ValidationError::StaticPath(path.clone()));
        }
    }

    if config.rate_limit.enabled {
        if config.rate_limit.requests == 0 {
            errors.push(ValidationError::ZeroRequests);
        }
        if config.rate_limit.seconds == 0 {
            errors.push(ValidationError::ZeroWindow);
        }
    }

    if config.events.history_limit == 0 {
        errors.push(ValidationError::ZeroHistory);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&ServerConfig::default()).is_ok());
    }

    #[test]
    fn collects_all_errors() {
        let mut config = ServerConfig::default();
        config.listener.bind_address = "not-an-address".into();
        config.rate_limit.requests = 0;
        config.rate_limit.seconds = 0;
        config.cache.static_paths.push("assets".into());

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.contains(&ValidationError::ZeroRequests));
        assert!(errors.contains(&ValidationError::StaticPath("assets".into())));
    }

    #[test]
    fn disabled_rate_limit_skips_checks() {
        let mut config = ServerConfig::default();
        config.rate_limit.enabled = false;
        config.rate_limit.requests = 0;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn zero_minimum_size_is_allowed() {
        let mut config = ServerConfig::default();
        config.compression.minimum_size = 0;
        assert!(validate_config(&config).is_ok());
    }
}
