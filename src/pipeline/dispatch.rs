//! Courier dispatch: wait for the courier, then pick the order up.

use crate::model::Order;
use crate::pipeline::{OrderHandler, PipelineError};
use crate::shelf::ShelfAllocator;
use async_trait::async_trait;
use futures::FutureExt;
use rand::Rng;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Supplies the courier travel time for each pickup attempt.
pub trait DelaySource: Send + Sync {
    fn next_delay(&self) -> Duration;
}

/// Travel times drawn uniformly from `[low, high]`.
#[derive(Debug, Clone, Copy)]
pub struct UniformDelay {
    low: f64,
    high: f64,
}

impl UniformDelay {
    /// Bounds are reordered if given backwards.
    pub fn new(low: Duration, high: Duration) -> Self {
        let (low, high) = (low.as_secs_f64(), high.as_secs_f64());
        Self {
            low: low.min(high),
            high: low.max(high),
        }
    }
}

impl DelaySource for UniformDelay {
    fn next_delay(&self) -> Duration {
        Duration::from_secs_f64(rand::rng().random_range(self.low..=self.high))
    }
}

/// The same travel time every time.
#[derive(Debug, Clone, Copy)]
pub struct FixedDelay(pub Duration);

impl DelaySource for FixedDelay {
    fn next_delay(&self) -> Duration {
        self.0
    }
}

impl<F> DelaySource for F
where
    F: Fn() -> Duration + Send + Sync,
{
    fn next_delay(&self) -> Duration {
        self()
    }
}

/// Simulates a courier for each fetched order.
///
/// After a delay the courier tries to pick the order up. A miss is normal: the
/// order may not be placed yet, or may have expired or been evicted. With
/// `retries > 0` the courier comes back after a fresh delay that many times
/// before the order counts as `failed_dispatch`. Every handled order ends up as
/// exactly one of `dispatched` or `failed_dispatch`, even if the courier panics.
pub struct DispatchHandler {
    allocator: Arc<ShelfAllocator>,
    delay: Arc<dyn DelaySource>,
    retries: u32,
}

impl DispatchHandler {
    pub fn new(allocator: Arc<ShelfAllocator>, delay: Arc<dyn DelaySource>, retries: u32) -> Self {
        Self {
            allocator,
            delay,
            retries,
        }
    }
}

#[async_trait]
impl OrderHandler for DispatchHandler {
    fn name(&self) -> &'static str {
        "dispatch"
    }

    async fn handle(&self, order: Order) -> Result<(), PipelineError> {
        let stats = self.allocator.stats();

        // A panicking courier still counts as a failed dispatch.
        let picked_up = match AssertUnwindSafe(self.attempt(&order)).catch_unwind().await {
            Ok(picked_up) => picked_up,
            Err(payload) => {
                stats.record_failed_dispatch();
                return Err(PipelineError::from_panic(payload.as_ref()));
            }
        };

        if picked_up {
            stats.record_dispatched();
        } else {
            stats.record_failed_dispatch();
            warn!(order_id = %order.id(), name = order.name(), "Order not found for dispatch");
        }
        Ok(())
    }
}

impl DispatchHandler {
    /// Sends the courier up to `retries + 1` times; true once the pickup succeeds.
    async fn attempt(&self, order: &Order) -> bool {
        for attempt in 0..=self.retries {
            let delay = self.delay.next_delay();
            debug!(order_id = %order.id(), attempt, delay_ms = delay.as_millis() as u64, "Courier en route");
            tokio::time::sleep(delay).await;

            if self.allocator.pickup(order.id(), order.shelf_class()) {
                info!(order_id = %order.id(), name = order.name(), attempt, "Order dispatched");
                return true;
            }
            debug!(order_id = %order.id(), attempt, "Pickup missed");
        }
        false
    }
}
