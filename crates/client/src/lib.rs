//! Client code for memberscan.
//!
//! This crate provides the Discord REST client that backs the snapshot
//! builders in `memberscan-core`.

pub mod discord;

pub use discord::{DiscordClient, DiscordConfig, DiscordError, User};
