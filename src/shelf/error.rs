//! Error types for shelf allocation.

use crate::model::OrderId;
use thiserror::Error;

/// Errors returned by [`ShelfAllocator`](crate::shelf::ShelfAllocator).
#[derive(Debug, Clone, Error, PartialEq)]
pub enum AllocationError {
    /// Every step of the placement cascade failed; the order is discarded.
    #[error("No shelf could take order {order_id}")]
    PlacementExhausted { order_id: OrderId },

    /// The id is already on a shelf, or another placement of it is in flight.
    #[error("Order {order_id} is already placed")]
    AlreadyPlaced { order_id: OrderId },
}
