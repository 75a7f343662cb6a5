//! Shared buffer of pending items
//!
//! The buffer is the only state shared between submitters and the event loop.
//! Every mutation happens under its mutex. The closed flag is readable without
//! the lock as a fast path but is always re-checked under the lock before
//! anything is mutated, so a submit racing a close can never slip an item in
//! after the drain has taken the backlog.
//!
//! Detached batches never share storage with the retained buffer: the tail
//! left behind by a size-triggered flush is moved into a fresh allocation.

use crate::batch::{BatchError, Result};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

pub(crate) struct SharedBuffer<T> {
    items: Mutex<Vec<T>>,
    closed: AtomicBool,
    size: usize,
}

impl<T> SharedBuffer<T> {
    /// `size` must be non-zero.
    pub(crate) fn new(size: usize) -> Self {
        debug_assert!(size > 0, "flush threshold must be positive");
        Self {
            items: Mutex::new(Vec::with_capacity(size)),
            closed: AtomicBool::new(false),
            size,
        }
    }

    /// Append an item
    ///
    /// Returns `true` when the buffer has reached the flush threshold.
    pub(crate) fn push(&self, item: T) -> Result<bool> {
        if self.is_closed() {
            return Err(BatchError::Closed);
        }
        let mut items = self.items.lock();
        if self.is_closed() {
            return Err(BatchError::Closed);
        }
        items.push(item);
        Ok(items.len() >= self.size)
    }

    /// Flip the closed flag, failing if another caller already did
    pub(crate) fn mark_closed(&self) -> Result<()> {
        if self.is_closed() {
            return Err(BatchError::Closed);
        }
        let _items = self.items.lock();
        if self.is_closed() {
            return Err(BatchError::Closed);
        }
        self.closed.store(true, Ordering::Release);
        Ok(())
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub(crate) fn len(&self) -> usize {
        self.items.lock().len()
    }

    /// Detach a full batch if the threshold has been reached
    ///
    /// `None` means the wake-up was stale.
    pub(crate) fn take_full(&self) -> Option<Vec<T>> {
        let mut items = self.items.lock();
        if items.len() < self.size {
            return None;
        }
        Some(self.detach_front(&mut items))
    }

    /// Detach whatever is pending on a timer tick
    ///
    /// At or above the threshold this behaves like [`take_full`](Self::take_full);
    /// below it the whole buffer goes out. `None` on an idle tick.
    pub(crate) fn take_due(&self) -> Option<Vec<T>> {
        let mut items = self.items.lock();
        if items.is_empty() {
            return None;
        }
        if items.len() >= self.size {
            return Some(self.detach_front(&mut items));
        }
        Some(std::mem::replace(
            &mut *items,
            Vec::with_capacity(self.size),
        ))
    }

    /// Take the entire backlog split into chunks of at most `size` items
    pub(crate) fn drain_chunks(&self) -> Vec<Vec<T>> {
        let backlog = std::mem::take(&mut *self.items.lock());
        chunk(backlog, self.size)
    }

    fn detach_front(&self, items: &mut Vec<T>) -> Vec<T> {
        let tail_len = items.len() - self.size;
        let mut rest = Vec::with_capacity(tail_len.max(self.size));
        rest.extend(items.drain(self.size..));
        std::mem::replace(items, rest)
    }
}

/// Split `items` into ordered chunks of at most `size`, the last possibly shorter
pub(crate) fn chunk<T>(items: Vec<T>, size: usize) -> Vec<Vec<T>> {
    let mut chunks = Vec::with_capacity(items.len().div_ceil(size));
    let mut iter = items.into_iter();
    loop {
        let next: Vec<T> = iter.by_ref().take(size).collect();
        if next.is_empty() {
            break;
        }
        chunks.push(next);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn filled(size: usize, count: usize) -> SharedBuffer<usize> {
        let buffer = SharedBuffer::new(size);
        for i in 0..count {
            buffer.push(i).unwrap();
        }
        buffer
    }

    #[test]
    fn test_push_reports_threshold() {
        let buffer = SharedBuffer::new(3);
        assert!(!buffer.push(1).unwrap());
        assert!(!buffer.push(2).unwrap());
        assert!(buffer.push(3).unwrap());
        assert!(buffer.push(4).unwrap());
        assert_eq!(buffer.len(), 4);
    }

    #[test]
    fn test_push_after_close_is_rejected() {
        let buffer = SharedBuffer::new(3);
        buffer.push(1).unwrap();
        buffer.mark_closed().unwrap();
        assert!(matches!(buffer.push(2), Err(BatchError::Closed)));
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn test_mark_closed_is_one_shot() {
        let buffer = SharedBuffer::<u8>::new(1);
        assert!(buffer.mark_closed().is_ok());
        assert!(matches!(buffer.mark_closed(), Err(BatchError::Closed)));
        assert!(buffer.is_closed());
    }

    #[test]
    fn test_take_full_ignores_stale_signal() {
        let buffer = filled(4, 3);
        assert!(buffer.take_full().is_none());
        assert_eq!(buffer.len(), 3);
    }

    #[test]
    fn test_take_full_keeps_tail_in_order() {
        let buffer = filled(3, 7);
        assert_eq!(buffer.take_full().unwrap(), vec![0, 1, 2]);
        assert_eq!(buffer.take_full().unwrap(), vec![3, 4, 5]);
        assert!(buffer.take_full().is_none());
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn test_detached_batch_is_not_aliased() {
        let buffer = filled(2, 3);
        let batch = buffer.take_full().unwrap();
        buffer.push(100).unwrap();
        buffer.push(101).unwrap();
        assert_eq!(batch, vec![0, 1]);
        assert_eq!(buffer.take_full().unwrap(), vec![2, 100]);
    }

    #[test]
    fn test_take_due_idle_tick() {
        let buffer = SharedBuffer::<u8>::new(4);
        assert!(buffer.take_due().is_none());
    }

    #[test]
    fn test_take_due_flushes_partial_batch() {
        let buffer = filled(5, 2);
        assert_eq!(buffer.take_due().unwrap(), vec![0, 1]);
        assert_eq!(buffer.len(), 0);
    }

    #[test]
    fn test_take_due_caps_at_threshold() {
        let buffer = filled(3, 5);
        assert_eq!(buffer.take_due().unwrap(), vec![0, 1, 2]);
        assert_eq!(buffer.take_due().unwrap(), vec![3, 4]);
        assert!(buffer.take_due().is_none());
    }

    #[test]
    fn test_drain_chunks() {
        let buffer = filled(4, 10);
        let chunks = buffer.drain_chunks();
        assert_eq!(chunks, vec![vec![0, 1, 2, 3], vec![4, 5, 6, 7], vec![8, 9]]);
        assert_eq!(buffer.len(), 0);
    }

    #[test]
    fn test_drain_empty_buffer() {
        let buffer = SharedBuffer::<u8>::new(4);
        assert!(buffer.drain_chunks().is_empty());
    }

    #[test]
    fn test_concurrent_push_and_close_loses_nothing() {
        let buffer = Arc::new(SharedBuffer::new(8));
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let buffer = buffer.clone();
                thread::spawn(move || {
                    (0..500)
                        .filter(|i| buffer.push(t * 1000 + i).is_ok())
                        .count()
                })
            })
            .collect();

        thread::yield_now();
        buffer.mark_closed().unwrap();

        let accepted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        let drained: usize = buffer.drain_chunks().iter().map(Vec::len).sum();
        assert_eq!(accepted, drained);
    }
}
