//! Time-bounded member scan.
//!
//! The builder is the only part of the snapshot machinery that talks to the
//! upstream. A scan either consumes the whole member stream before its
//! deadline or fails; partial matches are never returned.

use std::sync::Arc;
use std::time::Duration;

use futures_util::TryStreamExt;
use tokio::time::Instant;

use super::feature::SnapshotFeature;
use crate::upstream::{Guild, MemberSource};
use crate::Error;

/// Runs scans for one feature against one upstream source.
pub struct SnapshotBuilder<F, S: ?Sized> {
    feature: F,
    source: Arc<S>,
}

impl<F: SnapshotFeature, S: MemberSource + ?Sized> SnapshotBuilder<F, S> {
    pub fn new(feature: F, source: Arc<S>) -> Self {
        Self { feature, source }
    }

    pub fn feature(&self) -> &F {
        &self.feature
    }

    /// Resolve the guild behind `key`. Not time-bounded and never retried.
    pub async fn resolve(&self, key: &F::Key) -> Result<Option<Guild>, Error> {
        self.source.resolve_guild(self.feature.guild_id(key)).await
    }

    /// Resolve then scan. Fails with [`Error::EntityNotFound`] before any paging starts.
    pub async fn build(&self, key: &F::Key, deadline: Duration) -> Result<F::Payload, Error> {
        let guild = self
            .resolve(key)
            .await?
            .ok_or_else(|| Error::EntityNotFound(self.feature.guild_id(key)))?;
        self.scan(key, &guild, deadline).await
    }

    /// Consume the member stream of `guild` under `deadline` and assemble the payload.
    pub async fn scan(&self, key: &F::Key, guild: &Guild, deadline: Duration) -> Result<F::Payload, Error> {
        let start = Instant::now();
        tracing::debug!(feature = F::NAME, ?key, guild_id = guild.id, "starting member scan");

        let collect = async {
            let mut members = self.source.members(guild);
            let mut scanned = 0usize;
            let mut items = Vec::new();
            while let Some(member) = members.try_next().await? {
                scanned += 1;
                if let Some(item) = self.feature.select(key, &member) {
                    items.push(item);
                }
            }
            Ok::<_, Error>((scanned, items))
        };

        let (scanned, items) = match tokio::time::timeout(deadline, collect).await {
            Ok(result) => result?,
            Err(_) => {
                tracing::warn!(
                    feature = F::NAME,
                    ?key,
                    deadline_s = deadline.as_secs(),
                    "member scan timed out, discarding partial results"
                );
                return Err(Error::BuildTimeout(deadline));
            }
        };

        tracing::info!(
            feature = F::NAME,
            ?key,
            scanned,
            matched = items.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "member scan completed"
        );

        Ok(self.feature.assemble(key, guild, items))
    }
}
