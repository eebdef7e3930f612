//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use crate::snapshot::{MIN_DEADLINE_SECONDS, MIN_TTL_SECONDS};
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// TTLs and build timeouts below their floors are not errors; they are
    /// clamped when the snapshot settings are derived.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `http_host` or `user_agent` is empty
    /// - `discord_api_base` is not an http(s) URL
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `member_page_size` is outside 1..=1000
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.http_host.trim().is_empty() {
            return Err(ConfigError::Invalid { field: "http_host".into(), reason: "must not be empty".into() });
        }

        if !self.discord_api_base.starts_with("https://") && !self.discord_api_base.starts_with("http://") {
            return Err(ConfigError::Invalid {
                field: "discord_api_base".into(),
                reason: "must be an http(s) URL".into(),
            });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        if self.timeout_ms < 100 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if !(1..=1000).contains(&self.member_page_size) {
            return Err(ConfigError::Invalid {
                field: "member_page_size".into(),
                reason: "must be between 1 and 1000".into(),
            });
        }

        let role_members_ttl = self.role_members_cache_seconds.unwrap_or(self.boosters_cache_seconds);
        if self.boosters_cache_seconds < MIN_TTL_SECONDS || role_members_ttl < MIN_TTL_SECONDS {
            tracing::warn!(
                boosters_cache_seconds = self.boosters_cache_seconds,
                role_members_cache_seconds = role_members_ttl,
                floor = MIN_TTL_SECONDS,
                "cache TTL below floor; the floor will be used"
            );
        }
        if self.boosters_build_timeout_seconds < MIN_DEADLINE_SECONDS
            || self.role_members_build_timeout_seconds < MIN_DEADLINE_SECONDS
        {
            tracing::warn!(
                boosters_build_timeout_seconds = self.boosters_build_timeout_seconds,
                role_members_build_timeout_seconds = self.role_members_build_timeout_seconds,
                floor = MIN_DEADLINE_SECONDS,
                "build timeout below floor; the floor will be used"
            );
        }

        Ok(())
    }
}
