//! Scripted member source for snapshot tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{StreamExt, stream};

use crate::upstream::{Guild, Member, MemberSource, MemberStream, Role};
use crate::Error;

pub(crate) fn guild(id: u64, name: &str, roles: &[(u64, &str)]) -> Guild {
    Guild {
        id,
        name: name.to_string(),
        roles: roles.iter().map(|(id, name)| Role { id: *id, name: name.to_string() }).collect(),
    }
}

pub(crate) fn member(id: u64, roles: &[u64]) -> Member {
    Member {
        user_id: id,
        username: format!("user{id}"),
        display_name: format!("User {id}"),
        roles: roles.to_vec(),
        premium_since: None,
    }
}

/// Counts a scan as active for as long as its stream is alive.
struct ActiveScan {
    active: Arc<AtomicUsize>,
}

impl ActiveScan {
    fn enter(active: &Arc<AtomicUsize>, max_active: &AtomicUsize) -> Self {
        let now = active.fetch_add(1, Ordering::SeqCst) + 1;
        max_active.fetch_max(now, Ordering::SeqCst);
        Self { active: Arc::clone(active) }
    }
}

impl Drop for ActiveScan {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// One guild, one page of members, with optional delay, stall and failure.
pub(crate) struct FakeSource {
    guild: Guild,
    members: Vec<Member>,
    page_delay: Option<Duration>,
    resolve_delay: Option<Duration>,
    fail_after: Option<usize>,
    stalled: AtomicBool,
    scans: AtomicUsize,
    resolutions: AtomicUsize,
    active: Arc<AtomicUsize>,
    max_active: AtomicUsize,
}

impl FakeSource {
    pub(crate) fn new(guild: Guild) -> Self {
        Self {
            guild,
            members: Vec::new(),
            page_delay: None,
            resolve_delay: None,
            fail_after: None,
            stalled: AtomicBool::new(false),
            scans: AtomicUsize::new(0),
            resolutions: AtomicUsize::new(0),
            active: Arc::new(AtomicUsize::new(0)),
            max_active: AtomicUsize::new(0),
        }
    }

    pub(crate) fn with_members(mut self, members: Vec<Member>) -> Self {
        self.members = members;
        self
    }

    pub(crate) fn with_page_delay(mut self, delay: Duration) -> Self {
        self.page_delay = Some(delay);
        self
    }

    pub(crate) fn with_resolve_delay(mut self, delay: Duration) -> Self {
        self.resolve_delay = Some(delay);
        self
    }

    /// Yield `n` members, then an upstream error.
    pub(crate) fn failing_after(mut self, n: usize) -> Self {
        self.fail_after = Some(n);
        self
    }

    /// Never yield anything.
    pub(crate) fn stalled(self) -> Self {
        self.set_stalled(true);
        self
    }

    pub(crate) fn set_stalled(&self, stalled: bool) {
        self.stalled.store(stalled, Ordering::SeqCst);
    }

    pub(crate) fn scans(&self) -> usize {
        self.scans.load(Ordering::SeqCst)
    }

    pub(crate) fn resolutions(&self) -> usize {
        self.resolutions.load(Ordering::SeqCst)
    }

    pub(crate) fn max_concurrent_scans(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MemberSource for FakeSource {
    async fn resolve_guild(&self, guild_id: u64) -> Result<Option<Guild>, Error> {
        self.resolutions.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.resolve_delay {
            tokio::time::sleep(delay).await;
        }
        Ok((guild_id == self.guild.id).then(|| self.guild.clone()))
    }

    fn members<'a>(&'a self, _guild: &'a Guild) -> MemberStream<'a> {
        self.scans.fetch_add(1, Ordering::SeqCst);
        let scan = ActiveScan::enter(&self.active, &self.max_active);

        let stalled = self.stalled.load(Ordering::SeqCst);
        let delay = self.page_delay;
        let fail_after = self.fail_after;
        let members = self.members.clone();

        let page = async move {
            if stalled {
                std::future::pending::<()>().await;
            }
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            let mut items: Vec<Result<Member, Error>> = members.into_iter().map(Ok).collect();
            if let Some(n) = fail_after {
                items.truncate(n);
                items.push(Err(Error::Upstream("connection reset".into())));
            }
            stream::iter(items)
        };

        stream::once(page)
            .flatten()
            .map(move |item| {
                let _scan = &scan;
                item
            })
            .boxed()
    }
}
