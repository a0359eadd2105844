//! Semantic validation of a deserialized configuration.
//!
//! Serde only guarantees the shape of the file; everything that would make
//! the gateway misbehave at runtime is rejected here, all at once.

use std::net::SocketAddr;

use axum::http::HeaderValue;

use crate::config::schema::GatewayConfig;
use crate::resilience::MAX_RATE;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Validate the configuration, collecting every error.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!(
                "'{}' is not a socket address",
                config.observability.metrics_address
            ),
        ));
    }

    if config.rate_limit.requests_per_second == 0 {
        errors.push(ValidationError::new(
            "rate_limit.requests_per_second",
            "must be greater than zero",
        ));
    } else if config.rate_limit.requests_per_second > MAX_RATE {
        errors.push(ValidationError::new(
            "rate_limit.requests_per_second",
            format!("must be at most {MAX_RATE}"),
        ));
    }

    if config.retries.max_attempts == 0 {
        errors.push(ValidationError::new(
            "retries.max_attempts",
            "must be greater than zero",
        ));
    }

    if config.upstream.user_agent.trim().is_empty() {
        errors.push(ValidationError::new("upstream.user_agent", "must not be empty"));
    } else if HeaderValue::from_str(&config.upstream.user_agent).is_err() {
        errors.push(ValidationError::new(
            "upstream.user_agent",
            "must be a valid header value",
        ));
    }

    if config.upstream.quota_header.trim().is_empty() {
        errors.push(ValidationError::new("upstream.quota_header", "must not be empty"));
    }

    if config.limits.max_body_bytes == 0 {
        errors.push(ValidationError::new(
            "limits.max_body_bytes",
            "must be greater than zero",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
