//! Discord API client error types.

use std::sync::Arc;

use memberscan_core::Error;

/// Errors from the Discord REST client.
#[derive(Debug, thiserror::Error)]
pub enum DiscordError {
    /// No bot token configured.
    #[error("missing bot token: MEMBERSCAN_DISCORD_BOT_TOKEN not set")]
    MissingToken,

    /// The configured base URL does not parse.
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),

    /// Authentication failed (invalid bot token).
    #[error("authentication failed: invalid bot token")]
    AuthError,

    /// The bot lacks access or the required intent.
    #[error("forbidden: missing access")]
    Forbidden,

    /// Unknown guild, user or route.
    #[error("not found")]
    NotFound,

    /// Still rate limited after every retry.
    #[error("rate limited: retries exhausted")]
    RateLimited,

    /// Unexpected HTTP status.
    #[error("HTTP error: {status}")]
    HttpError { status: u16 },

    /// Request timeout.
    #[error("request timeout")]
    Timeout,

    /// Network error.
    #[error("network error: {0}")]
    Network(Arc<reqwest::Error>),

    /// Response parse error.
    #[error("parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for DiscordError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() { DiscordError::Timeout } else { DiscordError::Network(Arc::new(err)) }
    }
}

impl From<DiscordError> for Error {
    fn from(err: DiscordError) -> Self {
        match err {
            DiscordError::AuthError | DiscordError::MissingToken => Error::UpstreamAuth(err.to_string()),
            DiscordError::RateLimited => Error::UpstreamRateLimited(err.to_string()),
            _ => Error::Upstream(err.to_string()),
        }
    }
}
