//! Error types for intake queues.

use thiserror::Error;

/// Errors returned by [`OrderQueue`](crate::queue::OrderQueue) implementations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum QueueError {
    /// A bounded queue declined the item (backpressure).
    #[error("Queue is full")]
    Full,

    /// The queue was closed; no more items will be handed out.
    #[error("Queue is closed")]
    Closed,

    /// The backing queue failed to produce an item.
    #[error("Queue fetch failed: {0}")]
    Fetch(String),
}
