use crate::model::Order;
use crate::pipeline::{OrderHandler, PipelineError};
use crate::shelf::ShelfAllocator;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// Places each fetched order on a shelf.
///
/// A placed order counts as `processed`. An order no shelf can take, or one
/// whose id is already on a shelf, counts as `discarded` and is returned as an
/// error for the worker to log; it is never retried.
pub struct ProcessingHandler {
    allocator: Arc<ShelfAllocator>,
}

impl ProcessingHandler {
    pub fn new(allocator: Arc<ShelfAllocator>) -> Self {
        Self { allocator }
    }
}

#[async_trait]
impl OrderHandler for ProcessingHandler {
    fn name(&self) -> &'static str {
        "processing"
    }

    async fn handle(&self, order: Order) -> Result<(), PipelineError> {
        let stats = self.allocator.stats();
        match self.allocator.place(&order) {
            Ok(shelf) => {
                stats.record_processed();
                info!(order_id = %order.id(), name = order.name(), shelf = %shelf, "Order placed");
                Ok(())
            }
            Err(e) => {
                stats.record_discarded();
                Err(e.into())
            }
        }
    }
}
