use crate::clock::Clock;
use crate::model::{DecodeError, Order};
use crate::queue::OrderQueue;
use crate::stats::Stats;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Which queues hold a submitted order.
///
/// Intake feeds both queues or neither, so the two flags are either both set or
/// both clear; the log line of a rejected submit names the queue that refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SubmitOutcome {
    pub accepted_by_processing: bool,
    pub accepted_by_dispatch: bool,
}

impl SubmitOutcome {
    /// True only when both pools will see the order.
    pub fn accepted(&self) -> bool {
        self.accepted_by_processing && self.accepted_by_dispatch
    }
}

/// The ingestion entry point: feeds every order to both the processing and
/// the dispatch queue.
///
/// A slot is reserved on both queues before the order is committed to either.
/// If one queue refuses, the other reservation is released, so the processing
/// pool and the dispatch pool always see the same set of orders.
#[derive(Clone)]
pub struct Intake {
    processing: Arc<dyn OrderQueue>,
    dispatch: Arc<dyn OrderQueue>,
    clock: Arc<dyn Clock>,
    stats: Arc<Stats>,
}

impl Intake {
    pub fn new(
        processing: Arc<dyn OrderQueue>,
        dispatch: Arc<dyn OrderQueue>,
        clock: Arc<dyn Clock>,
        stats: Arc<Stats>,
    ) -> Self {
        Self {
            processing,
            dispatch,
            clock,
            stats,
        }
    }

    #[instrument(skip(self, order), fields(order_id = %order.id()))]
    pub fn submit(&self, order: Order) -> SubmitOutcome {
        self.stats.record_received();

        let processing = match self.processing.reserve(&order) {
            Ok(permit) => permit,
            Err(e) => {
                warn!(queue = "processing", error = %e, "Order rejected");
                return SubmitOutcome::default();
            }
        };
        let dispatch = match self.dispatch.reserve(&order) {
            Ok(permit) => permit,
            Err(e) => {
                warn!(queue = "dispatch", error = %e, "Order rejected");
                return SubmitOutcome::default();
            }
        };

        processing.commit(order.clone());
        dispatch.commit(order);

        debug!("Submitted");
        SubmitOutcome {
            accepted_by_processing: true,
            accepted_by_dispatch: true,
        }
    }

    /// Decodes one JSON order, stamps it with the current time and submits it.
    pub fn submit_json(&self, text: &str) -> Result<SubmitOutcome, DecodeError> {
        let order = Order::from_json_at(text, self.clock.now())?;
        Ok(self.submit(order))
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Orders still waiting in the `(processing, dispatch)` queues.
    pub fn pending(&self) -> (usize, usize) {
        (self.processing.len(), self.dispatch.len())
    }
}
