use log::{debug, error, warn};

use crate::buffer::UserSource;
use crate::errors::{DeviceError, Result};
use crate::session::QueueSession;

/// Write side of the copy protocol for one session.
pub struct QueueWriter<'a> {
    session: &'a QueueSession,
    name: &'a str,
    recheck_capacity: bool,
}

impl<'a> QueueWriter<'a> {
    pub fn new(session: &'a QueueSession, name: &'a str, recheck_capacity: bool) -> QueueWriter<'a> {
        QueueWriter {
            session,
            name,
            recheck_capacity,
        }
    }

    /// Appends every byte of `src` in order.
    ///
    /// Fails with [`DeviceError::Overflow`] before touching the queue when
    /// `src` cannot fit. A copy fault or allocation failure part way through
    /// keeps the bytes already queued and returns their count; the error is
    /// returned only when nothing was queued.
    pub fn write<S: UserSource + ?Sized>(&self, src: &S) -> Result<usize> {
        self.check_capacity(src.len())?;
        self.fill(src)
    }

    /// Capacity pre-check against the length published before the lock is
    /// taken. Two writers may both pass it; the queue bound still holds in
    /// [`QueueWriter::fill`].
    pub(crate) fn check_capacity(&self, count: usize) -> Result<()> {
        if exceeds(count, self.session.queued(), self.session.capacity()) {
            warn!("{}: queue overflow, {} bytes rejected", self.name, count);
            return Err(DeviceError::Overflow);
        }
        Ok(())
    }

    pub(crate) fn fill<S: UserSource + ?Sized>(&self, src: &S) -> Result<usize> {
        let count = src.len();
        let mut queue = self.session.lock_write();
        if self.recheck_capacity && exceeds(count, queue.len(), queue.capacity()) {
            warn!("{}: queue overflow under lock, {} bytes rejected", self.name, count);
            return Err(DeviceError::Overflow);
        }

        let mut written = 0;
        let mut fault = None;
        for offset in 0..count {
            let byte = match src.copy_byte_from(offset) {
                Ok(byte) => byte,
                Err(e) => {
                    error!("{}: failed to copy from caller at offset {}", self.name, offset);
                    fault = Some(e);
                    break;
                }
            };
            if let Err(e) = queue.enqueue(byte) {
                error!("{}: enqueue stopped after {} bytes: {}", self.name, written, e);
                fault = Some(e.into());
                break;
            }
            written += 1;
        }
        self.session.publish(&queue);
        drop(queue);

        debug!("{}: wrote {} bytes", self.name, written);
        partial(written, fault)
    }
}

#[inline]
fn exceeds(count: usize, queued: usize, capacity: usize) -> bool {
    count.checked_add(queued).map_or(true, |total| total > capacity)
}

/// Committed work wins over a late error.
#[inline]
pub(crate) fn partial(transferred: usize, fault: Option<DeviceError>) -> Result<usize> {
    match fault {
        Some(e) if transferred == 0 => Err(e),
        _ => Ok(transferred),
    }
}
