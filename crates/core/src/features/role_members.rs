//! Role members: ids of every guild member holding a given role.

use serde::{Deserialize, Serialize};

use super::{QueryParams, id_string, required};
use crate::snapshot::SnapshotFeature;
use crate::upstream::{Guild, Member};
use crate::Error;

/// Role name reported when the role is not in the resolved guild.
const UNKNOWN_ROLE: &str = "unknown";

/// Cache key: one guild, one role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct RoleMembersKey {
    #[serde(serialize_with = "id_string")]
    pub guild_id: u64,
    #[serde(serialize_with = "id_string")]
    pub role_id: u64,
}

/// One matching member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleMember {
    pub discord_user_id: String,
}

/// Snapshot payload for `GET /role-members`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleMembersPayload {
    pub guild_id: String,
    pub guild_name: String,
    pub role_id: String,
    pub role_name: String,
    pub count: usize,
    pub members: Vec<RoleMember>,
}

/// Role members feature.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoleMembers;

impl SnapshotFeature for RoleMembers {
    type Key = RoleMembersKey;
    type Item = RoleMember;
    type Payload = RoleMembersPayload;

    const NAME: &'static str = "role_members";

    fn parse_key(&self, params: &QueryParams) -> Result<RoleMembersKey, Error> {
        let guild_id = required(params, "guild_id")?;
        let role_id = required(params, "role_id")?;

        match (guild_id.parse(), role_id.parse()) {
            (Ok(guild_id), Ok(role_id)) => Ok(RoleMembersKey { guild_id, role_id }),
            _ => Err(Error::InvalidKey("invalid guild_id_or_role_id".into())),
        }
    }

    fn guild_id(&self, key: &RoleMembersKey) -> u64 {
        key.guild_id
    }

    fn select(&self, key: &RoleMembersKey, member: &Member) -> Option<RoleMember> {
        // @everyone shares the guild id and is implicit on every member.
        let holds_role = key.role_id == key.guild_id || member.roles.contains(&key.role_id);
        holds_role.then(|| RoleMember { discord_user_id: member.user_id.to_string() })
    }

    fn assemble(&self, key: &RoleMembersKey, guild: &Guild, members: Vec<RoleMember>) -> RoleMembersPayload {
        let role_name = guild
            .role(key.role_id)
            .map_or_else(|| UNKNOWN_ROLE.to_string(), |r| r.name.clone());

        RoleMembersPayload {
            guild_id: guild.id.to_string(),
            guild_name: guild.name.clone(),
            role_id: key.role_id.to_string(),
            role_name,
            count: members.len(),
            members,
        }
    }
}
