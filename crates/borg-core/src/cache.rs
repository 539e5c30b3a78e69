use std::{
    ops::{Deref, DerefMut},
    sync::Arc,
};

use borg_prometheus::BorgMetrics;
use time::OffsetDateTime;
use tokio::sync::{RwLock, RwLockWriteGuard};

/// Metric set plus collection bookkeeping, shared between the scheduler loop and any manual
/// trigger.
///
/// The write lock is held for a whole cycle. Scrapes never take it: they read the registry,
/// which holds its own clones of the metric families.
#[derive(Clone)]
pub struct SharedCache {
    inner: Arc<RwLock<CacheState>>,
}

pub struct CacheState {
    pub metrics: BorgMetrics,
    last_update: Option<OffsetDateTime>,
    collecting: bool,
}

impl CacheState {
    #[inline]
    pub fn last_update(&self) -> Option<OffsetDateTime> {
        self.last_update
    }

    #[inline]
    pub fn is_collecting(&self) -> bool {
        self.collecting
    }

    /// Record a successful repository update. Never moves `last_update` backwards.
    pub fn touch(&mut self, now: OffsetDateTime) {
        if self.last_update.is_none_or(|prev| now > prev) {
            self.last_update = Some(now);
        }
    }
}

impl SharedCache {
    pub fn new(metrics: BorgMetrics) -> Self {
        Self {
            inner: Arc::new(RwLock::new(CacheState {
                metrics,
                last_update: None,
                collecting: false,
            })),
        }
    }

    /// Take the write lock and mark a cycle as in flight.
    ///
    /// Returns `None` if a cycle is already marked. The mark is cleared when the guard drops.
    pub async fn begin_collection(&self) -> Option<CollectionGuard<'_>> {
        let mut state = self.inner.write().await;
        if state.collecting {
            return None;
        }
        state.collecting = true;
        Some(CollectionGuard { state })
    }

    /// Time of the most recent successful repository update.
    pub async fn last_update(&self) -> Option<OffsetDateTime> {
        self.inner.read().await.last_update
    }

    /// Non-blocking: a held write lock means a cycle is running.
    pub fn is_collecting(&self) -> bool {
        match self.inner.try_read() {
            Ok(state) => state.collecting,
            Err(_) => true,
        }
    }
}

/// Exclusive access to the cache for the duration of one cycle.
pub struct CollectionGuard<'a> {
    state: RwLockWriteGuard<'a, CacheState>,
}

impl Deref for CollectionGuard<'_> {
    type Target = CacheState;

    fn deref(&self) -> &Self::Target {
        &self.state
    }
}

impl DerefMut for CollectionGuard<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.state
    }
}

impl Drop for CollectionGuard<'_> {
    fn drop(&mut self) {
        self.state.collecting = false;
    }
}
