//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `version`, `user_agent` or `api_marker` is empty
    /// - `origin` is not an absolute http(s) URL
    /// - `freshness_secs` is 0
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `max_bytes` is 0 or exceeds 100MB
    /// - `critical_resources` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version.trim().is_empty() {
            return Err(invalid("version", "must not be empty"));
        }

        self.origin_url()?;

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        if self.freshness_secs == 0 {
            return Err(invalid("freshness_secs", "must be greater than 0"));
        }

        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.max_bytes == 0 {
            return Err(invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > 100 * 1024 * 1024 {
            return Err(invalid("max_bytes", "must not exceed 100MB"));
        }

        if self.api_store_marker().is_empty() {
            return Err(invalid("api_marker", "must not be empty"));
        }

        if self.critical_resources.is_empty() {
            return Err(invalid("critical_resources", "at least one resource is required"));
        }

        let overlap: Vec<&String> = self
            .cacheable_api
            .iter()
            .filter(|c| self.network_first_api.iter().any(|n| c.contains(n.as_str()) || n.contains(c.as_str())))
            .collect();
        if !overlap.is_empty() {
            tracing::warn!(
                ?overlap,
                "cacheable_api and network_first_api overlap; \
                 network-first takes precedence"
            );
        }

        Ok(())
    }
}
