use devio_common::model::{Id, post::PostMarker};
use parking_lot::Mutex;
use std::{
    collections::HashMap,
    sync::{Arc, Weak},
};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

const MIN_PRUNE_AT: usize = 64;

/// One async lock per post, created on demand.
///
/// The registry only keeps weak references, so a post's lock disappears once the
/// last guard and waiter for it are gone.
#[derive(Debug)]
pub struct PostLocks {
    inner: Mutex<Registry>,
}

#[derive(Debug)]
struct Registry {
    locks: HashMap<Id<PostMarker>, Weak<AsyncMutex<()>>>,
    prune_at: usize,
}

pub type PostGuard = OwnedMutexGuard<()>;

impl Default for PostLocks {
    fn default() -> Self {
        Self::new()
    }
}

impl PostLocks {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Registry {
                locks: HashMap::new(),
                prune_at: MIN_PRUNE_AT,
            }),
        }
    }

    pub async fn lock(&self, post: Id<PostMarker>) -> PostGuard {
        self.handle(post).lock_owned().await
    }

    fn handle(&self, post: Id<PostMarker>) -> Arc<AsyncMutex<()>> {
        let mut registry = self.inner.lock();

        if let Some(lock) = registry.locks.get(&post).and_then(Weak::upgrade) {
            return lock;
        }

        if registry.locks.len() >= registry.prune_at {
            registry.locks.retain(|_, lock| lock.strong_count() > 0);
            registry.prune_at = (registry.locks.len() * 2).max(MIN_PRUNE_AT);
        }

        let lock = Arc::new(AsyncMutex::new(()));
        registry.locks.insert(post, Arc::downgrade(&lock));
        lock
    }

    /// Number of posts that currently have a live lock.
    #[must_use]
    pub fn live(&self) -> usize {
        self.inner
            .lock()
            .locks
            .values()
            .filter(|lock| lock.strong_count() > 0)
            .count()
    }
}
