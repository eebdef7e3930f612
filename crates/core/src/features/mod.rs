//! The two member-scan features served by memberscan.
//!
//! - [`RoleMembers`]: ids of the members holding one role, keyed by guild and role
//! - [`Boosters`]: members currently boosting a guild, keyed by guild

use std::collections::HashMap;

use serde::Serializer;

use crate::Error;

pub mod boosters;
pub mod role_members;

pub use boosters::{Booster, Boosters, BoostersPayload, GuildKey};
pub use role_members::{RoleMember, RoleMembers, RoleMembersKey, RoleMembersPayload};

/// Raw request query parameters.
pub type QueryParams = HashMap<String, String>;

/// Trimmed, non-empty parameter value, or `missing <name>`.
fn required<'a>(params: &'a QueryParams, name: &str) -> Result<&'a str, Error> {
    params
        .get(name)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| Error::InvalidKey(format!("missing {name}")))
}

/// Snowflakes go over the wire as strings; JSON numbers lose precision past 2^53.
fn id_string<S: Serializer>(id: &u64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(id)
}
