//! The upstream collaborator consumed by the snapshot builder.
//!
//! A [`MemberSource`] resolves guilds and produces a lazy, paged stream of
//! members. The Discord REST client in `memberscan-client` is the production
//! implementation; tests plug in scripted sources.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::stream::BoxStream;

use crate::Error;

/// A guild role as known at resolution time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    pub id: u64,
    pub name: String,
}

/// A resolved guild with the metadata the payloads need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Guild {
    pub id: u64,
    pub name: String,
    pub roles: Vec<Role>,
}

impl Guild {
    /// Look up a role by id.
    pub fn role(&self, role_id: u64) -> Option<&Role> {
        self.roles.iter().find(|r| r.id == role_id)
    }
}

/// One guild member as yielded by the member stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub user_id: u64,
    pub username: String,
    /// Guild nickname, else global display name, else username.
    pub display_name: String,
    /// Role ids, without the implicit `@everyone` role.
    pub roles: Vec<u64>,
    /// Set while the member boosts the guild.
    pub premium_since: Option<DateTime<Utc>>,
}

/// Lazy member sequence. Each poll may cost a network round trip.
pub type MemberStream<'a> = BoxStream<'a, Result<Member, Error>>;

/// Source of guilds and their members.
#[async_trait]
pub trait MemberSource: Send + Sync {
    /// Resolve a guild, `Ok(None)` when it does not exist or is not accessible.
    async fn resolve_guild(&self, guild_id: u64) -> Result<Option<Guild>, Error>;

    /// Start a fresh member enumeration for `guild`.
    ///
    /// The stream is restartable: calling this again starts from the first page.
    fn members<'a>(&'a self, guild: &'a Guild) -> MemberStream<'a>;
}
