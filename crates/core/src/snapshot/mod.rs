//! Single-flight, time-bounded, TTL-cached member snapshots.
//!
//! This module provides the machinery shared by every snapshot feature:
//!
//! - [`CacheStore`]: last successful snapshot per key
//! - [`KeyedMutex`]: at most one in-flight build per key, busy callers are not queued
//! - [`SnapshotBuilder`]: deadline-bounded scan of the upstream member stream
//! - [`SnapshotService`]: the request contract tying the three together

pub mod builder;
pub mod feature;
pub mod keyed_mutex;
pub mod service;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use builder::SnapshotBuilder;
pub use feature::SnapshotFeature;
pub use keyed_mutex::{Acquisition, KeyGuard, KeyedMutex};
pub use service::{MIN_DEADLINE_SECONDS, MIN_TTL_SECONDS, SnapshotOutcome, SnapshotService, SnapshotSettings};
pub use store::{CacheStore, Snapshot};
