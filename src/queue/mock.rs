//! # Mock Queue
//!
//! Utilities for testing workers and the intake in isolation.
//!
//! [`MockQueue`] behaves like a plain in-memory FIFO until you inject outcome
//! generators. A generator is consulted on every call; returning `Some(outcome)`
//! overrides the call, returning `None` lets it fall through to the FIFO. The
//! enqueue generator runs at [`reserve`](OrderQueue::reserve) time, so a rejected
//! reservation never touches the FIFO.
//!
//! # Example
//! ```rust
//! use kitchen_shelves::queue::{MockQueue, OrderQueue, QueueError};
//! use kitchen_shelves::model::{Order, ShelfClass};
//!
//! # #[tokio::main]
//! # async fn main() {
//! // Reject every enqueue, as a saturated bounded queue would.
//! let queue = MockQueue::new().with_enqueue_outcomes(|_order| Some(Err(QueueError::Full)));
//! let order = Order::new("1", "Soup", ShelfClass::Hot, 100, 0.5);
//! assert_eq!(queue.enqueue(order), Err(QueueError::Full));
//!
//! // Fail the first fetch, then serve from the FIFO.
//! let mut failures = 1;
//! let queue = MockQueue::new().with_fetch_outcomes(move || {
//!     (failures > 0).then(|| {
//!         failures -= 1;
//!         Err(QueueError::Fetch("broker unavailable".into()))
//!     })
//! });
//! queue.enqueue(Order::new("2", "Salad", ShelfClass::Cold, 100, 0.5)).unwrap();
//! assert!(queue.fetch().await.is_err());
//! assert_eq!(queue.fetch().await.unwrap().id().0, "2");
//! # }
//! ```

use crate::model::Order;
use crate::queue::{EnqueuePermit, OrderQueue, QueueError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

/// Produces an override for `reserve`/`enqueue`, or `None` to use the FIFO.
pub type EnqueueOutcomes = Box<dyn Fn(&Order) -> Option<Result<(), QueueError>> + Send + Sync>;

/// Produces an override for `fetch`, or `None` to use the FIFO.
pub type FetchOutcomes = Box<dyn FnMut() -> Option<Result<Order, QueueError>> + Send>;

/// An in-memory [`OrderQueue`] with fault injection.
pub struct MockQueue {
    items: Mutex<VecDeque<Order>>,
    available: Notify,
    closed: CancellationToken,
    enqueue_outcomes: Option<EnqueueOutcomes>,
    fetch_outcomes: Option<Mutex<FetchOutcomes>>,
    enqueue_calls: AtomicUsize,
    fetch_calls: AtomicUsize,
}

impl MockQueue {
    /// Creates a mock that behaves as an unbounded FIFO.
    pub fn new() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            available: Notify::new(),
            closed: CancellationToken::new(),
            enqueue_outcomes: None,
            fetch_outcomes: None,
            enqueue_calls: AtomicUsize::new(0),
            fetch_calls: AtomicUsize::new(0),
        }
    }

    /// Installs a generator consulted on every `enqueue`.
    pub fn with_enqueue_outcomes(
        mut self,
        outcomes: impl Fn(&Order) -> Option<Result<(), QueueError>> + Send + Sync + 'static,
    ) -> Self {
        self.enqueue_outcomes = Some(Box::new(outcomes));
        self
    }

    /// Installs a generator consulted on every `fetch`.
    pub fn with_fetch_outcomes(
        mut self,
        outcomes: impl FnMut() -> Option<Result<Order, QueueError>> + Send + 'static,
    ) -> Self {
        self.fetch_outcomes = Some(Mutex::new(Box::new(outcomes)));
        self
    }

    /// Number of reservations (including those made by `enqueue`) seen so far,
    /// accepted or not.
    pub fn enqueue_calls(&self) -> usize {
        self.enqueue_calls.load(Ordering::SeqCst)
    }

    /// Number of `fetch` calls that returned a result.
    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    fn injected_fetch(&self) -> Option<Result<Order, QueueError>> {
        let outcomes = self.fetch_outcomes.as_ref()?;
        let mut generate = outcomes.lock().unwrap_or_else(PoisonError::into_inner);
        generate()
    }

    fn push(&self, order: Order) {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(order);
        self.available.notify_one();
    }

    fn pop(&self) -> Option<Order> {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
    }
}

impl Default for MockQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// `store` is false when an injected outcome accepted the order in place of the FIFO.
struct MockPermit<'a> {
    queue: &'a MockQueue,
    store: bool,
}

impl EnqueuePermit for MockPermit<'_> {
    fn commit(self: Box<Self>, order: Order) {
        if self.store {
            self.queue.push(order);
        }
    }
}

#[async_trait]
impl OrderQueue for MockQueue {
    async fn fetch(&self) -> Result<Order, QueueError> {
        loop {
            if self.closed.is_cancelled() {
                return Err(QueueError::Closed);
            }

            // Registered before the check so a notify_one landing in between is kept.
            let notified = self.available.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(outcome) = self.injected_fetch().or_else(|| self.pop().map(Ok)) {
                self.fetch_calls.fetch_add(1, Ordering::SeqCst);
                return outcome;
            }

            tokio::select! {
                _ = self.closed.cancelled() => return Err(QueueError::Closed),
                _ = &mut notified => {}
            }
        }
    }

    fn reserve(&self, order: &Order) -> Result<Box<dyn EnqueuePermit + '_>, QueueError> {
        self.enqueue_calls.fetch_add(1, Ordering::SeqCst);

        if self.closed.is_cancelled() {
            return Err(QueueError::Closed);
        }
        let store = match self.enqueue_outcomes.as_ref().and_then(|generate| generate(order)) {
            Some(Err(e)) => return Err(e),
            Some(Ok(())) => false,
            None => true,
        };
        Ok(Box::new(MockPermit { queue: self, store }))
    }

    fn close(&self) {
        self.closed.cancel();
    }

    fn len(&self) -> usize {
        self.items.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}
