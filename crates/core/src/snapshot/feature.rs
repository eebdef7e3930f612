//! The per-feature hooks plugged into the generic snapshot machinery.

use std::fmt::Debug;
use std::hash::Hash;

use serde::Serialize;

use crate::features::QueryParams;
use crate::upstream::{Guild, Member};
use crate::Error;

/// Key shape, selection and payload assembly for one kind of snapshot.
///
/// Implementations are stateless; everything that varies per request lives in the key.
pub trait SnapshotFeature: Send + Sync + 'static {
    /// Cache key. Serialized into the "building" response body.
    type Key: Clone + Eq + Hash + Debug + Serialize + Send + Sync + 'static;

    /// One accumulated match.
    type Item: Send + 'static;

    /// Assembled snapshot payload.
    type Payload: Send + Sync + 'static;

    /// Short name used in logs.
    const NAME: &'static str;

    /// Parse the key from request parameters, failing with [`Error::InvalidKey`].
    fn parse_key(&self, params: &QueryParams) -> Result<Self::Key, Error>;

    /// The guild the key refers to.
    fn guild_id(&self, key: &Self::Key) -> u64;

    /// Predicate and projection applied to every scanned member.
    fn select(&self, key: &Self::Key, member: &Member) -> Option<Self::Item>;

    /// Build the payload from the resolved guild and the matches in arrival order.
    fn assemble(&self, key: &Self::Key, guild: &Guild, items: Vec<Self::Item>) -> Self::Payload;
}
