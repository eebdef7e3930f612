//! Discord REST response types and normalization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

use memberscan_core::{Guild, Member, Role};

/// Discord sends snowflakes as decimal strings.
fn snowflake<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let raw = String::deserialize(deserializer)?;
    raw.parse().map_err(serde::de::Error::custom)
}

fn snowflakes<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u64>, D::Error> {
    Vec::<String>::deserialize(deserializer)?
        .iter()
        .map(|raw| raw.parse().map_err(serde::de::Error::custom))
        .collect()
}

/// User object.
#[derive(Debug, Clone, Deserialize)]
pub struct User {
    #[serde(deserialize_with = "snowflake")]
    pub id: u64,
    pub username: String,
    #[serde(default)]
    pub global_name: Option<String>,
    #[serde(default)]
    pub bot: bool,
}

/// Role object, as embedded in a guild.
#[derive(Debug, Deserialize)]
pub struct RoleObject {
    #[serde(deserialize_with = "snowflake")]
    pub id: u64,
    pub name: String,
}

/// Guild object (`GET /guilds/{id}`).
#[derive(Debug, Deserialize)]
pub struct GuildObject {
    #[serde(deserialize_with = "snowflake")]
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub roles: Vec<RoleObject>,
}

/// Guild member object (`GET /guilds/{id}/members`).
#[derive(Debug, Deserialize)]
pub struct MemberObject {
    pub user: User,
    #[serde(default)]
    pub nick: Option<String>,
    #[serde(default, deserialize_with = "snowflakes")]
    pub roles: Vec<u64>,
    #[serde(default)]
    pub premium_since: Option<DateTime<Utc>>,
}

/// Body of a 429 response.
#[derive(Debug, Deserialize)]
pub struct RateLimitBody {
    /// Seconds to wait.
    pub retry_after: f64,
    #[serde(default)]
    pub global: bool,
}

impl From<GuildObject> for Guild {
    fn from(raw: GuildObject) -> Self {
        Guild {
            id: raw.id,
            name: raw.name,
            roles: raw.roles.into_iter().map(|r| Role { id: r.id, name: r.name }).collect(),
        }
    }
}

impl From<MemberObject> for Member {
    /// Display name follows Discord's precedence: nickname, global name, username.
    fn from(raw: MemberObject) -> Self {
        let display_name = raw
            .nick
            .or(raw.user.global_name)
            .unwrap_or_else(|| raw.user.username.clone());

        Member {
            user_id: raw.user.id,
            username: raw.user.username,
            display_name,
            roles: raw.roles,
            premium_since: raw.premium_since,
        }
    }
}
