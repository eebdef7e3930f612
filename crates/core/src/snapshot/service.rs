//! Request-handling contract over the store, the keyed mutex and the builder.
//!
//! Per request: fresh cache entry → hit; key held by another build →
//! "building" signal, with no upstream call; unknown guild → not found;
//! otherwise take the key lock, re-check the cache and scan. Timeouts are
//! reported as "building" and never cached.

use std::sync::Arc;
use std::time::Duration;

use super::builder::SnapshotBuilder;
use super::feature::SnapshotFeature;
use super::keyed_mutex::{Acquisition, KeyedMutex};
use super::store::{CacheStore, Snapshot};
use crate::features::QueryParams;
use crate::upstream::MemberSource;
use crate::Error;

/// Smallest accepted cache TTL.
pub const MIN_TTL_SECONDS: u64 = 10;

/// Smallest accepted scan deadline.
pub const MIN_DEADLINE_SECONDS: u64 = 5;

/// Effective TTL and deadline of one feature instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotSettings {
    ttl: Duration,
    deadline: Duration,
}

impl SnapshotSettings {
    /// Clamp the configured values to their floors.
    pub fn new(ttl_seconds: u64, deadline_seconds: u64) -> Self {
        if ttl_seconds < MIN_TTL_SECONDS {
            tracing::warn!(ttl_seconds, floor = MIN_TTL_SECONDS, "cache ttl below floor, clamping");
        }
        if deadline_seconds < MIN_DEADLINE_SECONDS {
            tracing::warn!(deadline_seconds, floor = MIN_DEADLINE_SECONDS, "build deadline below floor, clamping");
        }

        Self {
            ttl: Duration::from_secs(ttl_seconds.max(MIN_TTL_SECONDS)),
            deadline: Duration::from_secs(deadline_seconds.max(MIN_DEADLINE_SECONDS)),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }
}

/// What a request resolved to.
#[derive(Debug)]
pub enum SnapshotOutcome<K, P> {
    /// A snapshot younger than the TTL, either cached or just built.
    Hit(Arc<P>),
    /// A build for this key is running or just timed out. Retry later.
    Building(K),
    /// The guild does not exist or is not accessible.
    NotFound(K),
    /// The request parameters did not form a key.
    InvalidKey(String),
}

/// Single-flight, TTL-cached snapshots for one feature.
pub struct SnapshotService<F: SnapshotFeature, S: ?Sized> {
    builder: SnapshotBuilder<F, S>,
    store: CacheStore<F::Key, F::Payload>,
    locks: KeyedMutex<F::Key>,
    settings: SnapshotSettings,
}

impl<F: SnapshotFeature, S: MemberSource + ?Sized> SnapshotService<F, S> {
    pub fn new(feature: F, source: Arc<S>, settings: SnapshotSettings) -> Self {
        Self {
            builder: SnapshotBuilder::new(feature, source),
            store: CacheStore::new(),
            locks: KeyedMutex::new(),
            settings,
        }
    }

    pub fn settings(&self) -> SnapshotSettings {
        self.settings
    }

    pub fn store(&self) -> &CacheStore<F::Key, F::Payload> {
        &self.store
    }

    pub fn locks(&self) -> &KeyedMutex<F::Key> {
        &self.locks
    }

    /// Parse the key from request parameters, then serve it.
    ///
    /// # Errors
    ///
    /// Returns upstream failures (auth, rate limit, network) from guild
    /// resolution or the member scan. Timeouts are not errors.
    pub async fn request(&self, params: &QueryParams) -> Result<SnapshotOutcome<F::Key, F::Payload>, Error> {
        match self.builder.feature().parse_key(params) {
            Ok(key) => self.request_snapshot(key).await,
            Err(Error::InvalidKey(reason)) => Ok(SnapshotOutcome::InvalidKey(reason)),
            Err(e) => Err(e),
        }
    }

    /// Serve `key` from the cache or build it, at most one build per key at a time.
    pub async fn request_snapshot(&self, key: F::Key) -> Result<SnapshotOutcome<F::Key, F::Payload>, Error> {
        if let Some(snapshot) = self.fresh(&key).await {
            tracing::debug!(feature = F::NAME, ?key, age_ms = snapshot.age().as_millis() as u64, "cache hit");
            return Ok(SnapshotOutcome::Hit(snapshot.payload));
        }

        // Busy keys answer without touching the upstream.
        if self.locks.is_held(&key).await {
            tracing::debug!(feature = F::NAME, ?key, "build already in flight");
            return Ok(SnapshotOutcome::Building(key));
        }

        let Some(guild) = self.builder.resolve(&key).await? else {
            tracing::debug!(feature = F::NAME, ?key, "guild not found or not accessible");
            return Ok(SnapshotOutcome::NotFound(key));
        };

        let _guard = match self.locks.try_acquire(&key).await {
            Acquisition::Acquired(guard) => guard,
            Acquisition::Busy => {
                tracing::debug!(feature = F::NAME, ?key, "build already in flight");
                return Ok(SnapshotOutcome::Building(key));
            }
        };

        // Another request may have committed between the first read and the acquisition.
        if let Some(snapshot) = self.fresh(&key).await {
            tracing::debug!(feature = F::NAME, ?key, "cache filled while acquiring");
            return Ok(SnapshotOutcome::Hit(snapshot.payload));
        }

        match self.builder.scan(&key, &guild, self.settings.deadline).await {
            Ok(payload) => {
                let snapshot = Snapshot::new(payload);
                let payload = Arc::clone(&snapshot.payload);
                self.store.put(key, snapshot).await;
                Ok(SnapshotOutcome::Hit(payload))
            }
            Err(Error::BuildTimeout(_)) => Ok(SnapshotOutcome::Building(key)),
            Err(e) => {
                if e.is_transient() {
                    tracing::warn!(feature = F::NAME, ?key, error = %e, "member scan failed");
                } else {
                    tracing::error!(feature = F::NAME, ?key, error = %e, "member scan failed");
                }
                Err(e)
            }
        }
    }

    async fn fresh(&self, key: &F::Key) -> Option<Snapshot<F::Payload>> {
        self.store
            .get(key)
            .await
            .filter(|snapshot| snapshot.is_fresh(self.settings.ttl))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{Boosters, GuildKey, RoleMembers, RoleMembersKey};
    use crate::snapshot::testing::{FakeSource, guild, member};

    fn role_key() -> RoleMembersKey {
        RoleMembersKey { guild_id: 1, role_id: 10 }
    }

    fn source() -> FakeSource {
        FakeSource::new(guild(1, "guild", &[(10, "mods")]))
            .with_members(vec![member(100, &[10]), member(101, &[]), member(102, &[10])])
    }

    fn service(source: &Arc<FakeSource>, ttl: u64, deadline: u64) -> SnapshotService<RoleMembers, FakeSource> {
        SnapshotService::new(RoleMembers, Arc::clone(source), SnapshotSettings::new(ttl, deadline))
    }

    fn hit<K: std::fmt::Debug, P: std::fmt::Debug>(outcome: SnapshotOutcome<K, P>) -> Arc<P> {
        match outcome {
            SnapshotOutcome::Hit(payload) => payload,
            other => panic!("expected hit, got {other:?}"),
        }
    }

    #[test]
    fn test_settings_floors() {
        let settings = SnapshotSettings::new(1, 1);
        assert_eq!(settings.ttl(), Duration::from_secs(10));
        assert_eq!(settings.deadline(), Duration::from_secs(5));

        let settings = SnapshotSettings::new(300, 25);
        assert_eq!(settings.ttl(), Duration::from_secs(300));
        assert_eq!(settings.deadline(), Duration::from_secs(25));
    }

    #[tokio::test(start_paused = true)]
    async fn test_miss_builds_and_caches() {
        let source = Arc::new(source());
        let service = service(&source, 300, 25);

        let payload = hit(service.request_snapshot(role_key()).await.unwrap());
        assert_eq!(payload.count, 2);
        assert_eq!(payload.members[0].discord_user_id, "100");
        assert_eq!(payload.members[1].discord_user_id, "102");
        assert_eq!(payload.role_name, "mods");

        let again = hit(service.request_snapshot(role_key()).await.unwrap());
        assert!(Arc::ptr_eq(&payload, &again));
        assert_eq!(source.scans(), 1);
        assert!(!service.locks().is_held(&role_key()).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_requests_single_flight() {
        let source = Arc::new(source().with_page_delay(Duration::from_secs(2)));
        let service = service(&source, 300, 25);

        let (first, second) = tokio::join!(service.request_snapshot(role_key()), service.request_snapshot(role_key()));

        let first = first.unwrap();
        let second = second.unwrap();
        assert!(matches!(first, SnapshotOutcome::Hit(_)));
        assert!(matches!(second, SnapshotOutcome::Building(ref key) if *key == role_key()));
        assert_eq!(source.scans(), 1);
        assert_eq!(source.max_concurrent_scans(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_busy_callers_skip_upstream() {
        let source = Arc::new(
            source()
                .with_resolve_delay(Duration::from_secs(3))
                .with_page_delay(Duration::from_secs(20)),
        );
        let service = Arc::new(service(&source, 300, 25));

        let builder = {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.request_snapshot(role_key()).await })
        };

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(service.locks().is_held(&role_key()).await);
        assert_eq!(source.resolutions(), 1);

        for _ in 0..5 {
            let started = tokio::time::Instant::now();
            let outcome = service.request_snapshot(role_key()).await.unwrap();
            assert!(matches!(outcome, SnapshotOutcome::Building(_)));
            assert_eq!(started.elapsed(), Duration::ZERO);
        }
        assert_eq!(source.resolutions(), 1);

        assert!(matches!(builder.await.unwrap().unwrap(), SnapshotOutcome::Hit(_)));
        assert_eq!(source.scans(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_many_concurrent_requests_never_overlap() {
        let source = Arc::new(source().with_page_delay(Duration::from_millis(500)));
        let service = Arc::new(service(&source, 10, 25));

        let mut handles = Vec::new();
        for i in 0..20u64 {
            let service = Arc::clone(&service);
            handles.push(tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(i)).await;
                service.request_snapshot(role_key()).await
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }

        assert!(source.scans() >= 2);
        assert_eq!(source.max_concurrent_scans(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_distinct_keys_build_concurrently() {
        let source = Arc::new(source().with_page_delay(Duration::from_secs(1)));
        let service = service(&source, 300, 25);
        let other = RoleMembersKey { guild_id: 1, role_id: 11 };

        let (a, b) = tokio::join!(service.request_snapshot(role_key()), service.request_snapshot(other));

        assert!(matches!(a.unwrap(), SnapshotOutcome::Hit(_)));
        assert!(matches!(b.unwrap(), SnapshotOutcome::Hit(_)));
        assert_eq!(source.max_concurrent_scans(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_boundary() {
        let source = Arc::new(source());
        let service = service(&source, 10, 25);

        let first = hit(service.request_snapshot(role_key()).await.unwrap());

        tokio::time::advance(Duration::from_secs(9)).await;
        let cached = hit(service.request_snapshot(role_key()).await.unwrap());
        assert!(Arc::ptr_eq(&first, &cached));
        assert_eq!(source.scans(), 1);

        tokio::time::advance(Duration::from_secs(2)).await;
        let rebuilt = hit(service.request_snapshot(role_key()).await.unwrap());
        assert!(!Arc::ptr_eq(&first, &rebuilt));
        assert_eq!(source.scans(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_floor_applies() {
        let source = Arc::new(source());
        let service = service(&source, 1, 25);
        assert_eq!(service.settings().ttl(), Duration::from_secs(10));

        hit(service.request_snapshot(role_key()).await.unwrap());

        tokio::time::advance(Duration::from_secs(5)).await;
        hit(service.request_snapshot(role_key()).await.unwrap());
        assert_eq!(source.scans(), 1);

        tokio::time::advance(Duration::from_secs(6)).await;
        hit(service.request_snapshot(role_key()).await.unwrap());
        assert_eq!(source.scans(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_returned_entries_never_older_than_ttl() {
        let source = Arc::new(source());
        let service = service(&source, 10, 25);

        for _ in 0..30 {
            hit(service.request_snapshot(role_key()).await.unwrap());
            let snapshot = service.store().get(&role_key()).await.unwrap();
            assert!(snapshot.age() < service.settings().ttl());
            tokio::time::advance(Duration::from_secs(3)).await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_upstream_times_out() {
        let source = Arc::new(source().stalled());
        let service = service(&source, 300, 5);

        let start = tokio::time::Instant::now();
        let outcome = service.request_snapshot(role_key()).await.unwrap();

        assert!(matches!(outcome, SnapshotOutcome::Building(_)));
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(5) && elapsed < Duration::from_millis(5_010));
        assert!(!service.locks().is_held(&role_key()).await);
        assert!(service.store().get(&role_key()).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_keeps_previous_entry() {
        let source = Arc::new(source());
        let service = service(&source, 10, 5);

        let first = hit(service.request_snapshot(role_key()).await.unwrap());
        let committed_at = service.store().get(&role_key()).await.unwrap().built_at;

        source.set_stalled(true);
        tokio::time::advance(Duration::from_secs(11)).await;
        let outcome = service.request_snapshot(role_key()).await.unwrap();
        assert!(matches!(outcome, SnapshotOutcome::Building(_)));

        let kept = service.store().get(&role_key()).await.unwrap();
        assert_eq!(kept.built_at, committed_at);
        assert!(Arc::ptr_eq(&kept.payload, &first));

        source.set_stalled(false);
        hit(service.request_snapshot(role_key()).await.unwrap());
        assert!(service.store().get(&role_key()).await.unwrap().built_at > committed_at);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_guild_takes_no_lock() {
        let source = Arc::new(source());
        let service = service(&source, 300, 25);
        let key = RoleMembersKey { guild_id: 2, role_id: 10 };

        let outcome = service.request_snapshot(key.clone()).await.unwrap();

        assert!(matches!(outcome, SnapshotOutcome::NotFound(ref k) if *k == key));
        assert!(!service.locks().contains(&key).await);
        assert!(service.locks().is_empty().await);
        assert_eq!(source.scans(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_upstream_failure_releases_lock() {
        let source = Arc::new(source().failing_after(1));
        let service = service(&source, 300, 25);

        let result = service.request_snapshot(role_key()).await;

        assert!(matches!(result, Err(Error::Upstream(_))));
        assert!(!service.locks().is_held(&role_key()).await);
        assert!(service.store().is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sequential_builds_are_idempotent() {
        let source = Arc::new(source());
        let service = service(&source, 10, 25);

        let first = hit(service.request_snapshot(role_key()).await.unwrap());
        tokio::time::advance(Duration::from_secs(10)).await;
        let second = hit(service.request_snapshot(role_key()).await.unwrap());

        assert_eq!(source.scans(), 2);
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(*first, *second);
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_invalid_key() {
        let source = Arc::new(source());
        let service = service(&source, 300, 25);
        let params = QueryParams::from([("guild_id".to_string(), "1".to_string())]);

        let outcome = service.request(&params).await.unwrap();

        assert!(matches!(outcome, SnapshotOutcome::InvalidKey(ref reason) if reason == "missing role_id"));
        assert_eq!(source.resolutions(), 0);
        assert!(service.locks().is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_parses_and_serves() {
        let source = Arc::new(source());
        let service = service(&source, 300, 25);
        let params = QueryParams::from([
            ("guild_id".to_string(), " 1 ".to_string()),
            ("role_id".to_string(), "10".to_string()),
        ]);

        let payload = hit(service.request(&params).await.unwrap());
        assert_eq!(payload.guild_id, "1");
        assert_eq!(payload.role_id, "10");
    }

    #[tokio::test(start_paused = true)]
    async fn test_boosters_service() {
        let mut booster = member(200, &[]);
        booster.premium_since = Some(chrono::Utc::now());
        let source = Arc::new(FakeSource::new(guild(1, "guild", &[])).with_members(vec![member(100, &[]), booster]));
        let service = SnapshotService::new(Boosters, Arc::clone(&source), SnapshotSettings::new(300, 25));

        let payload = hit(service.request_snapshot(GuildKey { guild_id: 1 }).await.unwrap());
        assert_eq!(payload.count, 1);
        assert_eq!(payload.boosters[0].discord_user_id, "200");
    }
}
