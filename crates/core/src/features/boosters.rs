//! Boosters: members with a `premium_since` timestamp.

use serde::{Deserialize, Serialize};

use super::{QueryParams, id_string, required};
use crate::snapshot::SnapshotFeature;
use crate::upstream::{Guild, Member};
use crate::Error;

/// Cache key: one guild.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct GuildKey {
    #[serde(serialize_with = "id_string")]
    pub guild_id: u64,
}

/// One booster with the display fields callers need.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booster {
    pub discord_user_id: String,
    pub username: String,
    pub display_name: String,
    /// RFC 3339.
    pub premium_since: String,
}

/// Snapshot payload for `GET /boosters`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoostersPayload {
    pub guild_id: String,
    pub guild_name: String,
    pub count: usize,
    pub boosters: Vec<Booster>,
}

/// Boosters feature.
#[derive(Debug, Clone, Copy, Default)]
pub struct Boosters;

impl SnapshotFeature for Boosters {
    type Key = GuildKey;
    type Item = Booster;
    type Payload = BoostersPayload;

    const NAME: &'static str = "boosters";

    fn parse_key(&self, params: &QueryParams) -> Result<GuildKey, Error> {
        let guild_id = required(params, "guild_id")?
            .parse()
            .map_err(|_| Error::InvalidKey("invalid guild_id".into()))?;
        Ok(GuildKey { guild_id })
    }

    fn guild_id(&self, key: &GuildKey) -> u64 {
        key.guild_id
    }

    fn select(&self, _key: &GuildKey, member: &Member) -> Option<Booster> {
        member.premium_since.map(|since| Booster {
            discord_user_id: member.user_id.to_string(),
            username: member.username.clone(),
            display_name: member.display_name.clone(),
            premium_since: since.to_rfc3339(),
        })
    }

    fn assemble(&self, _key: &GuildKey, guild: &Guild, boosters: Vec<Booster>) -> BoostersPayload {
        BoostersPayload {
            guild_id: guild.id.to_string(),
            guild_name: guild.name.clone(),
            count: boosters.len(),
            boosters,
        }
    }
}
