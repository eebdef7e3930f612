//! In-memory snapshot store.
//!
//! Holds the last successful snapshot per key. Entries are replaced on every
//! rebuild and never evicted; staleness is judged by the reader against a TTL.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;

/// An immutable built payload plus the instant it was committed.
#[derive(Debug)]
pub struct Snapshot<P> {
    pub built_at: Instant,
    pub payload: Arc<P>,
}

// Manual impl: cloning a snapshot only clones the Arc, so `P: Clone` is not needed.
impl<P> Clone for Snapshot<P> {
    fn clone(&self) -> Self {
        Self { built_at: self.built_at, payload: Arc::clone(&self.payload) }
    }
}

impl<P> Snapshot<P> {
    /// Stamp `payload` with the current instant.
    pub fn new(payload: P) -> Self {
        Self { built_at: Instant::now(), payload: Arc::new(payload) }
    }

    pub fn age(&self) -> Duration {
        self.built_at.elapsed()
    }

    /// Valid iff `now - built_at < ttl`.
    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.age() < ttl
    }
}

/// Key to last-snapshot map, safe for concurrent readers and writers.
#[derive(Debug)]
pub struct CacheStore<K, P> {
    entries: RwLock<HashMap<K, Snapshot<P>>>,
}

impl<K, P> Default for CacheStore<K, P> {
    fn default() -> Self {
        Self { entries: RwLock::new(HashMap::new()) }
    }
}

impl<K: Eq + Hash, P> CacheStore<K, P> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last committed snapshot for `key`, fresh or not.
    pub async fn get(&self, key: &K) -> Option<Snapshot<P>> {
        self.entries.read().await.get(key).cloned()
    }

    /// Replace the snapshot for `key`.
    pub async fn put(&self, key: K, snapshot: Snapshot<P>) {
        self.entries.write().await.insert(key, snapshot);
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
