use log::{debug, error};
use parking_lot::RwLockUpgradableReadGuard;

use crate::buffer::UserSink;
use crate::errors::Result;
use crate::session::QueueSession;
use crate::writer::partial;

/// Read side of the copy protocol for one session.
///
/// Reads enter through an upgradable read lock. It coexists with plain
/// length queries but excludes writers and other readers, and is upgraded to
/// exclusive before anything is dequeued.
pub struct QueueReader<'a> {
    session: &'a QueueSession,
    name: &'a str,
}

impl<'a> QueueReader<'a> {
    pub fn new(session: &'a QueueSession, name: &'a str) -> QueueReader<'a> {
        QueueReader { session, name }
    }

    /// Moves up to `dst.len()` bytes out of the queue, oldest first.
    ///
    /// Returns 0 when the queue is empty. A byte whose copy faults stays queued.
    pub fn read<D: UserSink + ?Sized>(&self, dst: &mut D) -> Result<usize> {
        let count = dst.len();
        let guard = self.session.lock_upgradable();
        if count == 0 || guard.is_empty() {
            debug!("{}: read 0 bytes", self.name);
            return Ok(0);
        }
        let mut queue = RwLockUpgradableReadGuard::upgrade(guard);

        let mut copied = 0;
        let mut fault = None;
        while copied < count {
            let Some(byte) = queue.peek() else {
                break;
            };
            if let Err(e) = dst.copy_byte_to(copied, byte) {
                error!("{}: failed to copy to caller at offset {}", self.name, copied);
                fault = Some(e);
                break;
            }
            queue.dequeue();
            copied += 1;
        }
        self.session.publish(&queue);
        drop(queue);

        debug!("{}: read {} bytes", self.name, copied);
        partial(copied, fault)
    }
}
