//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Upstream identity and signalling headers.
    pub upstream: UpstreamConfig,

    /// Global outbound rate limit.
    pub rate_limit: RateLimitConfig,

    /// Retry configuration.
    pub retries: RetryConfig,

    /// Upstream error budget protection.
    pub error_budget: ErrorBudgetConfig,

    /// Conditional response cache.
    pub cache: CacheConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Inbound request limits.
    pub limits: LimitsConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:13270").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:13270".to_string(),
        }
    }
}

/// Upstream API settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Gateway identity, prefixed to every outbound User-Agent.
    pub user_agent: String,

    /// Response header carrying the remaining error quota.
    pub quota_header: String,

    /// Response header carrying the upstream's own request id (logged only).
    pub request_id_header: String,

    /// Connection establishment timeout in seconds.
    pub connect_timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            user_agent: "bouncer-gateway".to_string(),
            quota_header: "X-ESI-Error-Limit-Remain".to_string(),
            request_id_header: "x-esi-request-id".to_string(),
            connect_timeout_secs: 10,
        }
    }
}

impl UpstreamConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Maximum outbound requests per second, shared by all callers.
    pub requests_per_second: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 20,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of upstream attempts per inbound request.
    pub max_attempts: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { max_attempts: 10 }
    }
}

/// Error budget configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ErrorBudgetConfig {
    /// Remaining quota below which all dispatch is paused.
    pub threshold: i64,

    /// Length of the pause in seconds.
    pub cooldown_secs: u64,
}

impl Default for ErrorBudgetConfig {
    fn default() -> Self {
        Self {
            threshold: 50,
            cooldown_secs: 60,
        }
    }
}

impl ErrorBudgetConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }
}

/// Conditional response cache.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Enable the ETag revalidation cache in front of the upstream client.
    pub enabled: bool,

    /// Maximum number of cached URLs.
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: 10_000,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:8888".to_string(),
        }
    }
}

/// Inbound request limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum inbound JSON body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 4 * 1024 * 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_upstream_contract() {
        let config = GatewayConfig::default();
        assert_eq!(config.retries.max_attempts, 10);
        assert_eq!(config.error_budget.threshold, 50);
        assert_eq!(config.error_budget.cooldown(), Duration::from_secs(60));
        assert_eq!(config.upstream.quota_header, "X-ESI-Error-Limit-Remain");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: GatewayConfig = toml::from_str(
            r#"
            [rate_limit]
            requests_per_second = 5

            [upstream]
            user_agent = "Podded - ops@example.com"
            "#,
        )
        .unwrap();

        assert_eq!(config.rate_limit.requests_per_second, 5);
        assert_eq!(config.upstream.user_agent, "Podded - ops@example.com");
        assert_eq!(config.upstream.quota_header, "X-ESI-Error-Limit-Remain");
        assert_eq!(config.listener.bind_address, "0.0.0.0:13270");
        assert!(config.cache.enabled);
    }
}
