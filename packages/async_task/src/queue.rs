//! Bounded FIFO work queue with backpressure and cooperative cancellation
//!
//! One mutex guards the buffer, the closed flag and the terminal fault. Two
//! [`Notify`] handles stand in for condition variables: `item_available`
//! wakes readers (on enqueue and close), `space_available` wakes writers
//! (on dequeue and close). The lock is never held across an `.await`.

use conduit_common::Error;
use std::collections::VecDeque;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Capacity used by [`BoundedWorkQueue::default`]
pub const DEFAULT_CAPACITY: NonZeroUsize = match NonZeroUsize::new(5) {
    Some(capacity) => capacity,
    None => panic!("default capacity must be non-zero"),
};

/// Errors returned by queue operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum QueueError {
    /// The cancellation signal fired before the operation could complete
    #[error("Queue operation cancelled")]
    Cancelled,
    /// Enqueue attempted after the queue was closed; the item was not stored
    #[error("Queue is closed")]
    QueueClosed,
    /// The producer closed the queue with a fault and the buffer is drained
    #[error("Upstream fault: {0}")]
    UpstreamFault(Error),
}

/// Fixed-capacity FIFO channel between a producer and a consumer
///
/// Handles are cheap to clone; every clone refers to the same queue.
pub struct BoundedWorkQueue<T> {
    shared: Arc<Shared<T>>,
}

struct Shared<T> {
    capacity: NonZeroUsize,
    state: Mutex<State<T>>,
    item_available: Notify,
    space_available: Notify,
}

struct State<T> {
    buffer: VecDeque<T>,
    closed: bool,
    fault: Option<Error>,
}

enum Offer<T> {
    Stored,
    Full(T),
    Closed,
}

enum Take<T> {
    Item(T),
    Empty,
    Drained,
    Faulted(Error),
}

impl<T> BoundedWorkQueue<T> {
    /// Create an open, empty queue holding at most `capacity` items
    #[must_use]
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            shared: Arc::new(Shared {
                capacity,
                state: Mutex::new(State {
                    buffer: VecDeque::with_capacity(capacity.get()),
                    closed: false,
                    fault: None,
                }),
                item_available: Notify::new(),
                space_available: Notify::new(),
            }),
        }
    }

    /// Maximum number of buffered items
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.shared.capacity.get()
    }

    /// Number of items currently buffered
    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.lock().buffer.len()
    }

    /// Whether no items are currently buffered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shared.lock().buffer.is_empty()
    }

    /// Whether [`close`](Self::close) has been called
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared.lock().closed
    }

    /// Store `item`, suspending while the queue is full
    ///
    /// # Errors
    ///
    /// Returns `QueueError::QueueClosed` if the queue has been closed, or
    /// `QueueError::Cancelled` if `cancel` fires (or has fired) before the
    /// item could be stored. On error the item is dropped, never stored.
    pub async fn enqueue(&self, item: T, cancel: &CancellationToken) -> Result<(), QueueError> {
        if cancel.is_cancelled() {
            return Err(QueueError::Cancelled);
        }

        let mut item = item;
        loop {
            // Register before checking state so a wakeup between the check
            // and the await is not lost.
            let space = self.shared.space_available.notified();
            tokio::pin!(space);
            space.as_mut().enable();

            match self.shared.offer(item) {
                Offer::Stored => return Ok(()),
                Offer::Closed => return Err(QueueError::QueueClosed),
                Offer::Full(rejected) => item = rejected,
            }

            trace!(capacity = self.capacity(), "queue full, producer waiting");
            tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(QueueError::Cancelled),
                () = &mut space => {}
            }
        }
    }

    /// Take the oldest item, suspending while the queue is empty and open
    ///
    /// Returns `Ok(None)` once the queue is closed and drained.
    ///
    /// # Errors
    ///
    /// Returns `QueueError::Cancelled` if `cancel` fires (or has fired)
    /// while waiting, or `QueueError::UpstreamFault` when the queue was
    /// closed with a fault and every buffered item has been delivered.
    pub async fn dequeue(&self, cancel: &CancellationToken) -> Result<Option<T>, QueueError> {
        if cancel.is_cancelled() {
            return Err(QueueError::Cancelled);
        }

        loop {
            let item = self.shared.item_available.notified();
            tokio::pin!(item);
            item.as_mut().enable();

            match self.shared.take() {
                Take::Item(value) => return Ok(Some(value)),
                Take::Drained => return Ok(None),
                Take::Faulted(fault) => return Err(QueueError::UpstreamFault(fault)),
                Take::Empty => {}
            }

            trace!("queue empty, consumer waiting");
            tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(QueueError::Cancelled),
                () = &mut item => {}
            }
        }
    }

    /// Mark the queue complete, optionally with a terminal fault
    ///
    /// Buffered items stay available to the consumer. Only the first call
    /// has an effect; it returns `true`, later calls return `false` and
    /// leave the original fault in place.
    pub fn close(&self, fault: Option<Error>) -> bool {
        {
            let mut state = self.shared.lock();
            if state.closed {
                debug!("close ignored, queue already closed");
                return false;
            }
            state.closed = true;
            debug!(
                buffered = state.buffer.len(),
                faulted = fault.is_some(),
                "queue closed"
            );
            state.fault = fault;
        }

        self.shared.item_available.notify_waiters();
        self.shared.space_available.notify_waiters();
        true
    }
}

impl<T> Shared<T> {
    fn lock(&self) -> MutexGuard<'_, State<T>> {
        // No operation leaves the state half-updated, so a poisoned lock is
        // still consistent.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn offer(&self, item: T) -> Offer<T> {
        let mut state = self.lock();
        if state.closed {
            return Offer::Closed;
        }
        if state.buffer.len() >= self.capacity.get() {
            return Offer::Full(item);
        }
        state.buffer.push_back(item);
        trace!(len = state.buffer.len(), "item enqueued");
        drop(state);

        self.item_available.notify_one();
        Offer::Stored
    }

    fn take(&self) -> Take<T> {
        let mut state = self.lock();
        if let Some(item) = state.buffer.pop_front() {
            trace!(len = state.buffer.len(), "item dequeued");
            drop(state);
            self.space_available.notify_one();
            return Take::Item(item);
        }
        if !state.closed {
            return Take::Empty;
        }
        match &state.fault {
            Some(fault) => Take::Faulted(fault.clone()),
            None => Take::Drained,
        }
    }
}

impl<T> Clone for BoundedWorkQueue<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> Default for BoundedWorkQueue<T> {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl<T> fmt::Debug for BoundedWorkQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.lock();
        f.debug_struct("BoundedWorkQueue")
            .field("capacity", &self.shared.capacity)
            .field("len", &state.buffer.len())
            .field("closed", &state.closed)
            .field("faulted", &state.fault.is_some())
            .finish()
    }
}
