//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (MEMBERSCAN_*)
//! 2. TOML config file (if MEMBERSCAN_CONFIG_FILE set)
//! 3. Built-in defaults

use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::snapshot::SnapshotSettings;

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (MEMBERSCAN_*)
/// 2. TOML config file (if MEMBERSCAN_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Discord bot token used for every upstream call.
    ///
    /// Set via MEMBERSCAN_DISCORD_BOT_TOKEN environment variable.
    #[serde(default)]
    pub discord_bot_token: Option<String>,

    /// Shared secret expected in the `x-admin-lab-key` request header.
    ///
    /// Set via MEMBERSCAN_API_KEY environment variable.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Address the HTTP API binds to.
    #[serde(default = "default_http_host")]
    pub http_host: String,

    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Discord REST base URL, including the API version.
    #[serde(default = "default_discord_api_base")]
    pub discord_api_base: String,

    /// User-Agent string for upstream requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Per-request upstream timeout in milliseconds.
    ///
    /// This bounds a single page fetch; whole scans are bounded by the build timeouts.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Members requested per page (Discord caps this at 1000).
    #[serde(default = "default_member_page_size")]
    pub member_page_size: u16,

    /// Boosters snapshot TTL.
    #[serde(default = "default_cache_seconds")]
    pub boosters_cache_seconds: u64,

    /// Role members snapshot TTL. Falls back to `boosters_cache_seconds`.
    #[serde(default)]
    pub role_members_cache_seconds: Option<u64>,

    #[serde(default = "default_build_timeout_seconds")]
    pub boosters_build_timeout_seconds: u64,

    #[serde(default = "default_build_timeout_seconds")]
    pub role_members_build_timeout_seconds: u64,
}

fn default_http_host() -> String {
    "127.0.0.1".into()
}

fn default_http_port() -> u16 {
    8787
}

fn default_discord_api_base() -> String {
    "https://discord.com/api/v10".into()
}

fn default_user_agent() -> String {
    concat!("DiscordBot (https://github.com/memberscan/memberscan, ", env!("CARGO_PKG_VERSION"), ")").into()
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_member_page_size() -> u16 {
    1000
}

fn default_cache_seconds() -> u64 {
    300
}

fn default_build_timeout_seconds() -> u64 {
    25
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            discord_bot_token: None,
            api_key: None,
            http_host: default_http_host(),
            http_port: default_http_port(),
            discord_api_base: default_discord_api_base(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            member_page_size: default_member_page_size(),
            boosters_cache_seconds: default_cache_seconds(),
            role_members_cache_seconds: None,
            boosters_build_timeout_seconds: default_build_timeout_seconds(),
            role_members_build_timeout_seconds: default_build_timeout_seconds(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// `host:port` for the HTTP listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.http_host, self.http_port)
    }

    /// Effective settings for the boosters feature, floors applied.
    pub fn boosters_settings(&self) -> SnapshotSettings {
        SnapshotSettings::new(self.boosters_cache_seconds, self.boosters_build_timeout_seconds)
    }

    /// Effective settings for the role members feature, floors applied.
    pub fn role_members_settings(&self) -> SnapshotSettings {
        SnapshotSettings::new(
            self.role_members_cache_seconds.unwrap_or(self.boosters_cache_seconds),
            self.role_members_build_timeout_seconds,
        )
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `MEMBERSCAN_`
    /// 2. TOML file from `MEMBERSCAN_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("MEMBERSCAN_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        Self::extract(figment.merge(Env::prefixed("MEMBERSCAN_").ignore(&["config_file"])))
    }

    fn extract(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// The bot token, required before any upstream call.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if the token is not set or blank.
    pub fn require_bot_token(&self) -> Result<&str, ConfigError> {
        non_blank(self.discord_bot_token.as_deref()).ok_or_else(|| ConfigError::Missing {
            field: "discord_bot_token".into(),
            hint: "Set MEMBERSCAN_DISCORD_BOT_TOKEN environment variable".into(),
        })
    }

    /// The API key guarding the HTTP routes.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if the key is not set or blank.
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        non_blank(self.api_key.as_deref()).ok_or_else(|| ConfigError::Missing {
            field: "api_key".into(),
            hint: "Set MEMBERSCAN_API_KEY environment variable".into(),
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
