//! Per-key, try-only mutual exclusion.
//!
//! One lock is created lazily per key and kept for the process lifetime; the
//! key space is bounded by the guilds and roles actually requested.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

/// Held while a build for one key is in flight. Dropping it releases the key.
#[derive(Debug)]
pub struct KeyGuard {
    _guard: OwnedMutexGuard<()>,
}

/// Result of [`KeyedMutex::try_acquire`].
#[derive(Debug)]
pub enum Acquisition {
    Acquired(KeyGuard),
    /// Another caller holds the key. Callers never queue behind it.
    Busy,
}

/// Lazily populated table of per-key locks.
#[derive(Debug)]
pub struct KeyedMutex<K> {
    locks: Mutex<HashMap<K, Arc<Mutex<()>>>>,
}

impl<K> Default for KeyedMutex<K> {
    fn default() -> Self {
        Self { locks: Mutex::new(HashMap::new()) }
    }
}

impl<K: Eq + Hash + Clone> KeyedMutex<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for `key` if nobody holds it, otherwise report `Busy` immediately.
    pub async fn try_acquire(&self, key: &K) -> Acquisition {
        let mut locks = self.locks.lock().await;
        let lock = Arc::clone(locks.entry(key.clone()).or_insert_with(|| Arc::new(Mutex::new(()))));

        // Decided under the table lock so `is_held` never sees a half-acquired key.
        match lock.try_lock_owned() {
            Ok(guard) => Acquisition::Acquired(KeyGuard { _guard: guard }),
            Err(_) => Acquisition::Busy,
        }
    }

    /// Whether a build currently holds `key`.
    ///
    /// Never creates an entry and never touches the per-key lock: a held lock
    /// is the one whose `Arc` is shared with a live guard.
    pub async fn is_held(&self, key: &K) -> bool {
        let locks = self.locks.lock().await;
        locks.get(key).is_some_and(|lock| Arc::strong_count(lock) > 1)
    }

    /// Whether a lock was ever created for `key`.
    pub async fn contains(&self, key: &K) -> bool {
        self.locks.lock().await.contains_key(key)
    }

    pub async fn len(&self) -> usize {
        self.locks.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.locks.lock().await.is_empty()
    }
}
