//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (TTL > 0, connection limit > 0)
//! - Check backend-specific settings (Redis URL scheme, metrics address)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::{IndexBackend, ProxyConfig};

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.max_connections must be greater than zero")]
    ZeroMaxConnections,

    #[error("cache.ttl_secs must be greater than zero")]
    ZeroTtl,

    #[error("cache.directory must not be empty")]
    EmptyCacheDirectory,

    #[error("cache.redis_url `{0}` must use the redis:// or rediss:// scheme")]
    InvalidRedisUrl(String),

    #[error("observability.metrics_address `{0}` is not a socket address")]
    InvalidMetricsAddress(String),
}

/// Check a parsed configuration for values serde cannot reject on its own.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.max_connections == 0 {
        errors.push(ValidationError::ZeroMaxConnections);
    }

    if config.cache.ttl_secs == 0 {
        errors.push(ValidationError::ZeroTtl);
    }

    if config.cache.directory.as_os_str().is_empty() {
        errors.push(ValidationError::EmptyCacheDirectory);
    }

    if config.cache.backend == IndexBackend::Redis {
        let url = &config.cache.redis_url;
        if !(url.starts_with("redis://") || url.starts_with("rediss://")) {
            errors.push(ValidationError::InvalidRedisUrl(url.clone()));
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
