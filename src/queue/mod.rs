//! # Intake Queues
//!
//! Accepted orders reach the worker pools through an [`OrderQueue`]. The trait is
//! the seam where an external queue (Kafka, SQS, ...) could be plugged in; this
//! crate ships two implementations:
//!
//! - [`ChannelQueue`] - in-process queue on tokio channels, unbounded or bounded
//! - [`MockQueue`] - in-memory test double with injectable enqueue/fetch outcomes
//!
//! Every running system owns two independent queues, one per worker pool, both
//! fed from [`Intake`](crate::pipeline::Intake).
//!
//! Enqueueing is split in two steps. [`OrderQueue::reserve`] claims a slot and
//! may fail; [`EnqueuePermit::commit`] fills it and cannot. Intake reserves on
//! both queues before committing to either, so an order reaches both pools or
//! neither.

pub mod channel;
pub mod error;
pub mod mock;

pub use channel::*;
pub use error::*;
pub use mock::*;

use crate::model::Order;
use async_trait::async_trait;

/// A claimed slot in an [`OrderQueue`].
///
/// Dropping the permit without committing releases the slot.
pub trait EnqueuePermit: Send {
    /// Places the order in the reserved slot.
    fn commit(self: Box<Self>, order: Order);
}

/// A multi-producer, multi-consumer queue of orders.
#[async_trait]
pub trait OrderQueue: Send + Sync {
    /// Waits for the next order.
    ///
    /// Returns [`QueueError::Closed`] once the queue has been closed. Callers that
    /// must stay responsive to shutdown race this against a cancellation token.
    async fn fetch(&self) -> Result<Order, QueueError>;

    /// Claims a slot for `order` without waiting.
    ///
    /// [`QueueError::Full`] signals backpressure from a bounded queue. Nothing is
    /// enqueued until the returned permit is committed.
    fn reserve(&self, order: &Order) -> Result<Box<dyn EnqueuePermit + '_>, QueueError>;

    /// Offers an order without waiting.
    fn enqueue(&self, order: Order) -> Result<(), QueueError> {
        self.reserve(&order)?.commit(order);
        Ok(())
    }

    /// Stops handing out orders; pending and future `fetch` calls return `Closed`.
    fn close(&self);

    /// Number of orders waiting to be fetched.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
