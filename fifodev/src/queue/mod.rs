use std::collections::VecDeque;

use crate::errors::PushError;

pub const QUEUE_SIZE: usize = 1000;

// Slots reserved when a queue is created. Storage then doubles on demand up
// to the queue's capacity.
const INITIAL_SLOTS: usize = 64;

/// Byte FIFO that never holds more than `capacity` elements.
///
/// Not synchronized: callers hold the owning session's lock.
#[derive(Debug)]
pub struct BoundedQueue {
    items: VecDeque<u8>,
    capacity: usize,
}

impl BoundedQueue {
    pub fn try_new(capacity: usize) -> Result<BoundedQueue, PushError> {
        let mut items = VecDeque::new();
        items
            .try_reserve_exact(capacity.min(INITIAL_SLOTS))
            .map_err(|_| PushError::OutOfMemory)?;
        Ok(BoundedQueue { items, capacity })
    }

    pub fn enqueue(&mut self, byte: u8) -> Result<(), PushError> {
        if self.items.len() >= self.capacity {
            return Err(PushError::Full);
        }
        if self.items.len() == self.items.capacity() {
            self.grow()?;
        }
        self.items.push_back(byte);
        Ok(())
    }

    pub fn dequeue(&mut self) -> Option<u8> {
        self.items.pop_front()
    }

    pub fn peek(&self) -> Option<u8> {
        self.items.front().copied()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Discards every queued byte and returns how many were dropped.
    pub fn clear(&mut self) -> usize {
        let dropped = self.items.len();
        self.items.clear();
        dropped
    }

    fn grow(&mut self) -> Result<(), PushError> {
        let len = self.items.len();
        let additional = len.max(1).min(self.capacity - len);
        self.items
            .try_reserve_exact(additional)
            .map_err(|_| PushError::OutOfMemory)
    }
}
