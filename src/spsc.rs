//! Handoff Pipeline - bounded lock-free single-producer/single-consumer ring.
//!
//! One cell is always left empty so that `head == tail` means empty and
//! `next(head) == tail` means full, with no shared counter.
//!
//! # Memory Ordering
//!
//! - Producer writes the cell, then publishes `head` with `Release`.
//!   Consumer loads `head` with `Acquire` before reading the cell, so it
//!   never sees a partially written item.
//! - Consumer reads the cell, then publishes `tail` with `Release`.
//!   Producer loads `tail` with `Acquire` before reusing a cell, so it
//!   never overwrites an item that has not been taken.
//!
//! Each index is only ever stored by its owning side, which reads its own
//! index with `Relaxed`.
//!
//! Neither end blocks. Retrying on full/empty is the caller's business.

use std::cell::UnsafeCell;
use std::fmt;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use thiserror::Error;

/// Keeps each index on its own cache line
#[repr(align(64))]
struct CacheAligned<T>(T);

struct Shared<T> {
    /// Next cell the producer will write
    head: CacheAligned<AtomicUsize>,
    /// Next cell the consumer will read
    tail: CacheAligned<AtomicUsize>,
    producer_gone: AtomicBool,
    consumer_gone: AtomicBool,
    cells: Box<[UnsafeCell<MaybeUninit<T>>]>,
}

// SAFETY: cells in [tail, head) are owned by the consumer and the rest by
// the producer; the acquire/release index protocol hands each cell over
// exactly once, and only one Producer and one Consumer exist.
unsafe impl<T: Send> Send for Shared<T> {}
unsafe impl<T: Send> Sync for Shared<T> {}

impl<T> Shared<T> {
    #[inline]
    fn next(&self, index: usize) -> usize {
        let next = index + 1;
        if next == self.cells.len() {
            0
        } else {
            next
        }
    }

    #[inline]
    fn len(&self) -> usize {
        let head = self.head.0.load(Ordering::Acquire);
        let tail = self.tail.0.load(Ordering::Acquire);
        if head >= tail {
            head - tail
        } else {
            self.cells.len() - tail + head
        }
    }
}

impl<T> Drop for Shared<T> {
    fn drop(&mut self) {
        let head = *self.head.0.get_mut();
        let mut tail = *self.tail.0.get_mut();
        while tail != head {
            // SAFETY: cells in [tail, head) hold initialized, untaken items.
            unsafe { self.cells[tail].get_mut().assume_init_drop() };
            tail = self.next(tail);
        }
    }
}

/// Create a ring with `slots` cells, holding at most `slots - 1` items.
///
/// # Panics
/// Panics if `slots < 2`.
pub fn ring_buffer<T>(slots: usize) -> (Producer<T>, Consumer<T>) {
    assert!(slots >= 2, "Ring buffer needs at least 2 slots");

    let cells = (0..slots)
        .map(|_| UnsafeCell::new(MaybeUninit::uninit()))
        .collect::<Vec<_>>()
        .into_boxed_slice();

    let shared = Arc::new(Shared {
        head: CacheAligned(AtomicUsize::new(0)),
        tail: CacheAligned(AtomicUsize::new(0)),
        producer_gone: AtomicBool::new(false),
        consumer_gone: AtomicBool::new(false),
        cells,
    });

    (
        Producer {
            shared: Arc::clone(&shared),
        },
        Consumer { shared },
    )
}

/// Returned by [`Producer::push`] when the ring is full; carries the item back.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushError<T> {
    #[error("ring buffer is full")]
    Full(T),
}

impl<T> PushError<T> {
    pub fn into_inner(self) -> T {
        match self {
            PushError::Full(item) => item,
        }
    }
}

/// Writing end. Not `Clone`: there is exactly one producer.
pub struct Producer<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Producer<T> {
    /// Try to enqueue an item without blocking.
    #[inline]
    pub fn push(&mut self, item: T) -> Result<(), PushError<T>> {
        let shared = &*self.shared;
        let head = shared.head.0.load(Ordering::Relaxed);
        let next = shared.next(head);
        if next == shared.tail.0.load(Ordering::Acquire) {
            return Err(PushError::Full(item));
        }

        // SAFETY: `head` is outside [tail, head), so the consumer will not
        // touch this cell until the store below publishes it.
        unsafe { (*shared.cells[head].get()).write(item) };
        shared.head.0.store(next, Ordering::Release);
        Ok(())
    }

    /// Whether the ring currently holds no items
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.shared.head.0.load(Ordering::Relaxed) == self.shared.tail.0.load(Ordering::Acquire)
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        let head = self.shared.head.0.load(Ordering::Relaxed);
        self.shared.next(head) == self.shared.tail.0.load(Ordering::Acquire)
    }

    /// Items currently queued (a snapshot)
    #[inline]
    pub fn len(&self) -> usize {
        self.shared.len()
    }

    /// Maximum number of queued items
    #[inline]
    pub fn capacity(&self) -> usize {
        self.shared.cells.len() - 1
    }

    /// True once the consumer has been dropped
    #[inline]
    pub fn is_abandoned(&self) -> bool {
        self.shared.consumer_gone.load(Ordering::Acquire)
    }
}

impl<T> Drop for Producer<T> {
    fn drop(&mut self) {
        self.shared.producer_gone.store(true, Ordering::Release);
    }
}

impl<T> fmt::Debug for Producer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Producer")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .finish()
    }
}

/// Reading end. Not `Clone`: there is exactly one consumer.
pub struct Consumer<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Consumer<T> {
    /// Try to dequeue the oldest item without blocking.
    #[inline]
    pub fn pop(&mut self) -> Option<T> {
        let shared = &*self.shared;
        let tail = shared.tail.0.load(Ordering::Relaxed);
        if tail == shared.head.0.load(Ordering::Acquire) {
            return None;
        }

        // SAFETY: `tail` is inside [tail, head), published by the producer's
        // release store, and is not reused until the store below.
        let item = unsafe { (*shared.cells[tail].get()).assume_init_read() };
        shared.tail.0.store(shared.next(tail), Ordering::Release);
        Some(item)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.shared.tail.0.load(Ordering::Relaxed) == self.shared.head.0.load(Ordering::Acquire)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.shared.len()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.shared.cells.len() - 1
    }

    /// True once the producer has been dropped.
    ///
    /// Every item pushed before the drop is still poppable afterwards.
    #[inline]
    pub fn is_abandoned(&self) -> bool {
        self.shared.producer_gone.load(Ordering::Acquire)
    }
}

impl<T> Drop for Consumer<T> {
    fn drop(&mut self) {
        self.shared.consumer_gone.store(true, Ordering::Release);
    }
}

impl<T> fmt::Debug for Consumer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Consumer")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .finish()
    }
}
