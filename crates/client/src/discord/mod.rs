//! Discord REST API client.
//!
//! Provides the production [`MemberSource`]: guild resolution plus a paged,
//! lazily fetched member listing, with rate limit handling.
//!
//! ### Endpoints
//!
//! - `GET /users/@me`: startup identity check
//! - `GET /guilds/{guild_id}`: guild name and roles; 403/404 mean "no such guild"
//! - `GET /guilds/{guild_id}/members?limit=N&after=ID`: member pages in user id order
//!
//! ### Rate limiting
//!
//! A 429 carries `retry_after` (seconds). Every request made through the same
//! client waits until that point has passed, then retries, up to
//! [`MAX_RATE_LIMIT_RETRIES`] times per request.

pub mod error;
pub mod response;

pub use error::DiscordError;
pub use response::User;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{StreamExt, TryStreamExt, stream};
use reqwest::{StatusCode, header};
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tokio::time::Instant;
use url::Url;

use memberscan_core::{AppConfig, Error, Guild, Member, MemberSource, MemberStream};
use response::{GuildObject, MemberObject, RateLimitBody};

/// Default base URL for the Discord REST API.
const DEFAULT_BASE_URL: &str = "https://discord.com/api/v10";

/// Default request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Discord's maximum page size for member listing.
const MAX_PAGE_SIZE: u16 = 1000;

/// 429 retries per request before giving up.
pub const MAX_RATE_LIMIT_RETRIES: u32 = 5;

/// Upper bound on a single rate limit wait.
const MAX_RETRY_AFTER: Duration = Duration::from_secs(60);

/// Discord API client configuration.
#[derive(Debug, Clone)]
pub struct DiscordConfig {
    /// Bot token, sent as `Authorization: Bot <token>`.
    pub token: String,
    /// Base URL including the API version.
    pub base_url: String,
    pub timeout: Duration,
    pub user_agent: String,
    /// Members per page, 1..=1000.
    pub page_size: u16,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: concat!("DiscordBot (https://github.com/memberscan/memberscan, ", env!("CARGO_PKG_VERSION"), ")")
                .to_string(),
            page_size: MAX_PAGE_SIZE,
        }
    }
}

impl DiscordConfig {
    /// Build the client configuration from the application configuration.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, DiscordError> {
        let token = config.require_bot_token().map_err(|_| DiscordError::MissingToken)?;

        Ok(Self {
            token: token.to_string(),
            base_url: config.discord_api_base.clone(),
            timeout: config.timeout(),
            user_agent: config.user_agent.clone(),
            page_size: config.member_page_size,
        })
    }
}

/// Shared back-off state, set from 429 responses.
#[derive(Debug, Default)]
struct RateLimiter {
    blocked_until: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Wait out any active back-off.
    async fn acquire(&self) {
        let until = *self.blocked_until.lock().await;
        if let Some(until) = until
            && until > Instant::now()
        {
            tokio::time::sleep_until(until).await;
        }
    }

    /// Block every request until `retry_after` from now.
    async fn back_off(&self, retry_after: Duration) {
        let until = Instant::now() + retry_after.min(MAX_RETRY_AFTER);
        let mut blocked = self.blocked_until.lock().await;
        if blocked.is_none_or(|current| current < until) {
            *blocked = Some(until);
        }
    }
}

/// Member paging cursor.
#[derive(Debug, Clone, Copy)]
enum Cursor {
    Start,
    After(u64),
    Done,
}

/// Discord REST API client.
#[derive(Debug, Clone)]
pub struct DiscordClient {
    http: reqwest::Client,
    config: DiscordConfig,
    rate_limiter: Arc<RateLimiter>,
}

impl DiscordClient {
    /// Create a new Discord client with the given configuration.
    pub fn new(mut config: DiscordConfig) -> Result<Self, DiscordError> {
        if config.token.trim().is_empty() {
            return Err(DiscordError::MissingToken);
        }

        Url::parse(&config.base_url).map_err(|e| DiscordError::InvalidBaseUrl(format!("{}: {e}", config.base_url)))?;
        config.base_url = config.base_url.trim_end_matches('/').to_string();
        config.page_size = config.page_size.clamp(1, MAX_PAGE_SIZE);

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| DiscordError::Network(Arc::new(e)))?;

        Ok(Self { http, config, rate_limiter: Arc::new(RateLimiter::default()) })
    }

    /// Create a new Discord client from the application configuration.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, DiscordError> {
        Self::new(DiscordConfig::from_app_config(config)?)
    }

    /// The bot user behind the token.
    pub async fn current_user(&self) -> Result<User, DiscordError> {
        self.get_json("/users/@me", &[]).await
    }

    /// Fetch a guild, `None` when it does not exist or the bot cannot see it.
    pub async fn guild(&self, guild_id: u64) -> Result<Option<Guild>, DiscordError> {
        match self.get_json::<GuildObject>(&format!("/guilds/{guild_id}"), &[]).await {
            Ok(guild) => Ok(Some(guild.into())),
            Err(DiscordError::NotFound | DiscordError::Forbidden) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Fetch one page of members with user ids greater than `after`.
    pub async fn member_page(&self, guild_id: u64, after: u64) -> Result<Vec<Member>, DiscordError> {
        let query = [("limit", self.config.page_size.to_string()), ("after", after.to_string())];
        let page: Vec<MemberObject> = self.get_json(&format!("/guilds/{guild_id}/members"), &query).await?;

        Ok(page.into_iter().map(Member::from).collect())
    }

    /// Issue a GET, waiting out and retrying rate limits.
    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T, DiscordError> {
        let url = format!("{}{}", self.config.base_url, path);

        for attempt in 0..=MAX_RATE_LIMIT_RETRIES {
            self.rate_limiter.acquire().await;

            tracing::debug!(path, attempt, "Discord API request");

            let http_response = self
                .http
                .get(&url)
                .header(header::AUTHORIZATION, format!("Bot {}", self.config.token))
                .header(header::ACCEPT, "application/json")
                .header(header::USER_AGENT, &self.config.user_agent)
                .query(query)
                .send()
                .await?;

            let status = http_response.status();
            tracing::debug!(path, %status, "Discord API response");

            match status {
                StatusCode::TOO_MANY_REQUESTS => {
                    let header_wait = http_response
                        .headers()
                        .get(header::RETRY_AFTER)
                        .and_then(|v| v.to_str().ok())
                        .and_then(|v| v.parse::<f64>().ok());
                    let body = http_response.bytes().await?;
                    let (retry_after, global) = match serde_json::from_slice::<RateLimitBody>(&body) {
                        Ok(limit) => (limit.retry_after, limit.global),
                        Err(_) => (header_wait.unwrap_or(1.0), false),
                    };

                    tracing::warn!(path, attempt, retry_after, global, "rate limited by Discord");
                    self.rate_limiter
                        .back_off(Duration::try_from_secs_f64(retry_after).unwrap_or(MAX_RETRY_AFTER))
                        .await;
                    continue;
                }
                StatusCode::UNAUTHORIZED => return Err(DiscordError::AuthError),
                StatusCode::FORBIDDEN => return Err(DiscordError::Forbidden),
                StatusCode::NOT_FOUND => return Err(DiscordError::NotFound),
                s if s.is_client_error() || s.is_server_error() => {
                    return Err(DiscordError::HttpError { status: s.as_u16() });
                }
                _ => {}
            }

            let bytes = http_response.bytes().await?;
            return serde_json::from_slice(&bytes).map_err(|e| DiscordError::Parse(e.to_string()));
        }

        Err(DiscordError::RateLimited)
    }
}

#[async_trait]
impl MemberSource for DiscordClient {
    async fn resolve_guild(&self, guild_id: u64) -> Result<Option<Guild>, Error> {
        Ok(self.guild(guild_id).await?)
    }

    /// Pages are fetched on demand; a short page ends the listing.
    fn members<'a>(&'a self, guild: &'a Guild) -> MemberStream<'a> {
        let guild_id = guild.id;
        let page_size = usize::from(self.config.page_size);

        stream::try_unfold(Cursor::Start, move |cursor| async move {
            let after = match cursor {
                Cursor::Start => 0,
                Cursor::After(id) => id,
                Cursor::Done => return Ok(None),
            };

            let page = self.member_page(guild_id, after).await?;
            let next = match page.last() {
                Some(last) if page.len() >= page_size => Cursor::After(last.user_id),
                _ => Cursor::Done,
            };

            Ok::<_, Error>(Some((page, next)))
        })
        .map_ok(|page| stream::iter(page.into_iter().map(Ok::<Member, Error>)))
        .try_flatten()
        .boxed()
    }
}
