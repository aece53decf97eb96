use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::{RwLock, RwLockUpgradableReadGuard, RwLockWriteGuard};

use crate::errors::Result;
use crate::queue::BoundedQueue;

/// One independently synchronized queue instance.
///
/// `queued` mirrors the queue length and is refreshed whenever a writer or
/// reader releases the lock, so it can be sampled without locking.
#[derive(Debug)]
pub struct QueueSession {
    queue: RwLock<BoundedQueue>,
    queued: AtomicUsize,
    capacity: usize,
}

impl QueueSession {
    pub fn new(capacity: usize) -> Result<QueueSession> {
        let queue = BoundedQueue::try_new(capacity)?;
        Ok(QueueSession {
            queue: RwLock::new(queue),
            queued: AtomicUsize::new(0),
            capacity,
        })
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Length as last published by a reader or writer. Lock-free.
    #[inline]
    pub fn queued(&self) -> usize {
        self.queued.load(Ordering::Acquire)
    }

    /// Exact length, taken under a shared lock.
    pub fn len(&self) -> usize {
        self.queue.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Discards every queued byte. Returns how many were dropped.
    pub fn drain(&self) -> usize {
        let mut queue = self.queue.write();
        let dropped = queue.clear();
        self.publish(&queue);
        dropped
    }

    pub(crate) fn lock_write(&self) -> RwLockWriteGuard<'_, BoundedQueue> {
        self.queue.write()
    }

    pub(crate) fn lock_upgradable(&self) -> RwLockUpgradableReadGuard<'_, BoundedQueue> {
        self.queue.upgradable_read()
    }

    #[inline]
    pub(crate) fn publish(&self, queue: &BoundedQueue) {
        self.queued.store(queue.len(), Ordering::Release);
    }
}
