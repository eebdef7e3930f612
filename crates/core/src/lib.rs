//! Core types and shared functionality for memberscan.
//!
//! This crate provides:
//! - The single-flight, TTL-cached snapshot machinery
//! - The two member-scan features (role members, boosters)
//! - The upstream collaborator trait and its data types
//! - Unified error types
//! - Configuration structures

pub mod config;
pub mod error;
pub mod features;
pub mod snapshot;
pub mod upstream;

pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use features::{Boosters, QueryParams, RoleMembers};
pub use snapshot::{SnapshotOutcome, SnapshotService, SnapshotSettings};
pub use upstream::{Guild, Member, MemberSource, MemberStream, Role};
