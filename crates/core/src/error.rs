//! Unified error types for memberscan.
//!
//! Each message starts with a stable code so logs and HTTP bodies can be
//! matched without parsing prose.

use std::time::Duration;

/// Unified error type shared by the snapshot core, the upstream client and the server.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// The request did not carry a usable cache key (missing or malformed id).
    #[error("INVALID_KEY: {0}")]
    InvalidKey(String),

    /// The guild does not exist or the bot cannot see it.
    #[error("ENTITY_NOT_FOUND: guild {0}")]
    EntityNotFound(u64),

    /// The member scan did not finish before its deadline.
    #[error("BUILD_TIMEOUT: scan did not finish within {}s", .0.as_secs())]
    BuildTimeout(Duration),

    /// The upstream API failed (network, unexpected status, bad body).
    #[error("UPSTREAM_ERROR: {0}")]
    Upstream(String),

    /// The upstream API rejected our credentials.
    #[error("UPSTREAM_AUTH: {0}")]
    UpstreamAuth(String),

    /// The upstream API kept rate limiting us.
    #[error("UPSTREAM_RATE_LIMITED: {0}")]
    UpstreamRateLimited(String),
}

impl Error {
    /// Whether a later request for the same key may succeed without any change on our side.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::BuildTimeout(_) | Error::Upstream(_) | Error::UpstreamRateLimited(_))
    }
}
