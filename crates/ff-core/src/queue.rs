//! Bounded multi-producer / multi-consumer work queue.
//!
//! [`WorkQueue`] is the hand-off point between the crawler workers, the
//! change watcher, and their consumer threads. It is the only place in the
//! system (besides the pause condition variable) where a thread blocks.
//!
//! # Shutdown protocol
//!
//! `shutdown()` sets an atomic flag and wakes every waiter. After shutdown:
//!
//! - `push` becomes a no-op returning `false`
//! - `pop` keeps draining queued items and returns `None` only once empty
//! - `restart()` clears the flag so the queue can be reused
//!
//! Items already queued are never lost by shutting down; consumers drain
//! them first.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// A bounded MPMC queue with blocking, timed, and non-blocking pops.
///
/// FIFO order holds per producer thread; no global order is promised across
/// producers. When the queue is at capacity, `push` blocks until a consumer
/// makes room or the queue shuts down.
///
/// # Examples
///
/// ```
/// use ff_core::WorkQueue;
///
/// let queue: WorkQueue<u32> = WorkQueue::new(16);
/// assert!(queue.push(1));
/// assert_eq!(queue.pop(), Some(1));
///
/// queue.shutdown();
/// assert!(!queue.push(2));
/// assert_eq!(queue.pop(), None);
/// ```
#[derive(Debug)]
pub struct WorkQueue<T> {
    inner: Mutex<Inner<T>>,
    /// Signalled when an item arrives or shutdown begins.
    items: Condvar,
    /// Signalled when space frees up or shutdown begins.
    space: Condvar,
    capacity: usize,
}

#[derive(Debug)]
struct Inner<T> {
    queue: VecDeque<T>,
    shutdown: bool,
}

impl<T> WorkQueue<T> {
    /// Creates a queue holding at most `capacity` items.
    ///
    /// A zero capacity is bumped to 1 so `push` can ever succeed.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                queue: VecDeque::with_capacity(capacity.max(1).min(4096)),
                shutdown: false,
            }),
            items: Condvar::new(),
            space: Condvar::new(),
            capacity: capacity.max(1),
        }
    }

    /// Pushes an item, blocking while the queue is full.
    ///
    /// Returns `false` without queueing when the queue is (or becomes, while
    /// waiting for space) shut down.
    pub fn push(&self, item: T) -> bool {
        let mut inner = self.inner.lock();
        loop {
            if inner.shutdown {
                return false;
            }
            if inner.queue.len() < self.capacity {
                inner.queue.push_back(item);
                drop(inner);
                self.items.notify_one();
                return true;
            }
            self.space.wait(&mut inner);
        }
    }

    /// Pops an item, blocking until one arrives.
    ///
    /// Returns `None` only when the queue has been shut down *and* drained.
    pub fn pop(&self) -> Option<T> {
        let mut inner = self.inner.lock();
        loop {
            if let Some(item) = inner.queue.pop_front() {
                drop(inner);
                self.space.notify_one();
                return Some(item);
            }
            if inner.shutdown {
                return None;
            }
            self.items.wait(&mut inner);
        }
    }

    /// Pops an item without blocking.
    pub fn try_pop(&self) -> Option<T> {
        let mut inner = self.inner.lock();
        let item = inner.queue.pop_front();
        if item.is_some() {
            drop(inner);
            self.space.notify_one();
        }
        item
    }

    /// Pops an item, waiting at most `timeout`.
    ///
    /// Returns `None` on timeout, or on drained shutdown as with [`pop`].
    ///
    /// [`pop`]: WorkQueue::pop
    pub fn pop_timeout(&self, timeout: Duration) -> Option<T> {
        let deadline = Instant::now() + timeout;
        let mut inner = self.inner.lock();
        loop {
            if let Some(item) = inner.queue.pop_front() {
                drop(inner);
                self.space.notify_one();
                return Some(item);
            }
            if inner.shutdown {
                return None;
            }
            if self.items.wait_until(&mut inner, deadline).timed_out() {
                let item = inner.queue.pop_front();
                if item.is_some() {
                    drop(inner);
                    self.space.notify_one();
                }
                return item;
            }
        }
    }

    /// Shuts the queue down and wakes every waiting producer and consumer.
    ///
    /// Queued items remain poppable; see the module docs for the protocol.
    pub fn shutdown(&self) {
        let mut inner = self.inner.lock();
        inner.shutdown = true;
        drop(inner);
        self.items.notify_all();
        self.space.notify_all();
    }

    /// Clears the shutdown flag so the queue accepts pushes again.
    pub fn restart(&self) {
        self.inner.lock().shutdown = false;
    }

    /// Returns `true` once [`shutdown`](WorkQueue::shutdown) has been called
    /// (and [`restart`](WorkQueue::restart) has not).
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.inner.lock().shutdown
    }

    /// Number of queued items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().queue.len()
    }

    /// Returns `true` when no items are queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().queue.is_empty()
    }

    /// Discards all queued items, waking blocked producers.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.queue.clear();
        drop(inner);
        self.space.notify_all();
    }

    /// Maximum number of items the queue holds.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}
