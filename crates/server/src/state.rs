//! Shared application state: one snapshot service per feature.

use std::sync::Arc;

use memberscan_core::{AppConfig, Boosters, MemberSource, RoleMembers, SnapshotService};

pub struct AppState {
    /// Expected value of the `x-admin-lab-key` header.
    pub api_key: String,
    pub role_members: SnapshotService<RoleMembers, dyn MemberSource>,
    pub boosters: SnapshotService<Boosters, dyn MemberSource>,
}

impl AppState {
    /// Both features share one upstream source and keep separate caches and locks.
    pub fn new(config: &AppConfig, api_key: impl Into<String>, source: Arc<dyn MemberSource>) -> Self {
        Self {
            api_key: api_key.into(),
            role_members: SnapshotService::new(RoleMembers, Arc::clone(&source), config.role_members_settings()),
            boosters: SnapshotService::new(Boosters, source, config.boosters_settings()),
        }
    }
}
