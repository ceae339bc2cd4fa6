//! # Reclamation Loop
//!
//! Orders decay whether or not anyone looks at them. The [`Reclaimer`] wakes up
//! on a fixed interval and sweeps every shelf, so expired orders free their
//! slots even when no new placements arrive.
//!
//! Each shelf sweep runs in isolation: if one panics, the panic is logged and
//! the remaining shelves (and every later tick) are still swept.

use crate::model::ShelfClass;
use crate::pipeline::PipelineError;
use crate::shelf::ShelfAllocator;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

pub struct Reclaimer {
    allocator: Arc<ShelfAllocator>,
    interval: Duration,
    cancel: CancellationToken,
}

impl Reclaimer {
    pub fn new(allocator: Arc<ShelfAllocator>, interval: Duration, cancel: CancellationToken) -> Self {
        Self {
            allocator,
            interval,
            cancel,
        }
    }

    /// Sweeps on every tick until cancelled.
    pub async fn run(self) {
        info!(interval_ms = self.interval.as_millis() as u64, "Reclaimer started");

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = ticker.tick() => {
                    self.sweep_once();
                }
            }
        }

        info!("Reclaimer stopped");
    }

    /// Sweeps every shelf once and returns how many orders were removed.
    pub fn sweep_once(&self) -> usize {
        let now = self.allocator.clock().now();
        let mut removed = 0;

        for class in ShelfClass::ALL {
            let sweep = std::panic::catch_unwind(AssertUnwindSafe(|| {
                self.allocator.sweep_shelf(class, now).len()
            }));
            match sweep {
                Ok(count) => removed += count,
                Err(payload) => {
                    let e = PipelineError::from_panic(payload.as_ref());
                    error!(shelf = %class, error = %e, "Sweep failed");
                }
            }
        }

        debug!(removed, "Sweep complete");
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::model::Order;
    use crate::stats::Stats;

    #[test]
    fn test_sweep_once_removes_expired_orders() {
        let clock = Arc::new(ManualClock::new());
        let stats = Arc::new(Stats::new());
        let allocator = Arc::new(ShelfAllocator::new(clock.clone(), stats.clone()));

        let order = Order::with_clock("1", "Fries", ShelfClass::Hot, 1, 1.0, clock.as_ref());
        allocator.place(&order).unwrap();

        let reclaimer = Reclaimer::new(allocator.clone(), Duration::from_secs(1), CancellationToken::new());
        assert_eq!(reclaimer.sweep_once(), 0);

        clock.advance(Duration::from_secs(1));
        assert_eq!(reclaimer.sweep_once(), 1);
        assert!(!allocator.shelf(ShelfClass::Hot).contains(order.id()));
        assert_eq!(stats.snapshot().expired, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_sweeps_on_interval_and_stops_on_cancel() {
        let clock = Arc::new(ManualClock::new());
        let allocator = Arc::new(ShelfAllocator::new(clock.clone(), Arc::new(Stats::new())));
        let order = Order::with_clock("1", "Fries", ShelfClass::Hot, 1, 1.0, clock.as_ref());
        allocator.place(&order).unwrap();

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(Reclaimer::new(allocator.clone(), Duration::from_millis(100), cancel.clone()).run());

        clock.advance(Duration::from_secs(1));
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(allocator.locate(order.id()), None);

        cancel.cancel();
        handle.await.unwrap();
    }
}
