//! # Worker Pool
//!
//! A [`WorkerPool`] is a fixed set of long-lived tasks that share one
//! [`OrderQueue`]. Every worker runs the same loop:
//!
//! ```text
//! fetch (cancellable) -> OrderHandler::handle (cancellable) -> log outcome -> repeat
//! ```
//!
//! The loop is written once and parameterized by the [`OrderHandler`], so the
//! processing and dispatch pools differ only in what they do with an order.
//!
//! ## Failure Isolation
//! A handler error or panic affects only the order being handled. The panic is
//! caught at the worker boundary, logged, and the worker fetches the next item.
//! A failed fetch is logged the same way. Only cancellation or a closed queue
//! ends a worker.

use crate::model::Order;
use crate::pipeline::PipelineError;
use crate::queue::{OrderQueue, QueueError};
use async_trait::async_trait;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};

/// What a pool does with each order it fetches.
#[async_trait]
pub trait OrderHandler: Send + Sync + 'static {
    /// Pool name used in logs (`processing`, `dispatch`, ...).
    fn name(&self) -> &'static str;

    async fn handle(&self, order: Order) -> Result<(), PipelineError>;
}

/// Handles to the tasks of one running pool.
pub struct WorkerPool {
    name: &'static str,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawns `size` workers consuming `queue` with `handler`.
    ///
    /// Workers run until `cancel` fires or the queue is closed.
    pub fn spawn<H: OrderHandler>(
        size: usize,
        queue: Arc<dyn OrderQueue>,
        handler: Arc<H>,
        cancel: CancellationToken,
    ) -> Self {
        let name = handler.name();
        let handles = (0..size)
            .map(|worker_id| {
                let span = info_span!("worker", pool = name, worker_id);
                tokio::spawn(
                    run_worker(queue.clone(), handler.clone(), cancel.clone()).instrument(span),
                )
            })
            .collect();

        info!(pool = name, size, "Worker pool started");
        Self { name, handles }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Number of workers in the pool.
    pub fn size(&self) -> usize {
        self.handles.len()
    }

    /// Waits for every worker to exit.
    ///
    /// All workers are awaited even if one of them failed; the first failure
    /// is returned.
    pub async fn join(self) -> Result<(), JoinError> {
        let mut first_failure = None;
        for handle in self.handles {
            if let Err(e) = handle.await {
                error!(pool = self.name, error = %e, "Worker task failed");
                first_failure.get_or_insert(e);
            }
        }
        match first_failure {
            Some(e) => Err(e),
            None => {
                info!(pool = self.name, "Worker pool stopped");
                Ok(())
            }
        }
    }
}

async fn run_worker<H: OrderHandler>(
    queue: Arc<dyn OrderQueue>,
    handler: Arc<H>,
    cancel: CancellationToken,
) {
    debug!("Worker started");

    loop {
        let order = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            fetched = queue.fetch() => match fetched {
                Ok(order) => order,
                Err(QueueError::Closed) => break,
                Err(e) => {
                    warn!(error = %e, "Fetch failed");
                    tokio::task::yield_now().await;
                    continue;
                }
            },
        };

        let order_id = order.id().clone();
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(%order_id, "Abandoned in-flight order");
                break;
            }
            outcome = AssertUnwindSafe(handler.handle(order)).catch_unwind() => outcome,
        };

        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(%order_id, error = %e, "Handling failed"),
            Err(payload) => {
                let e = PipelineError::from_panic(payload.as_ref());
                error!(%order_id, error = %e, "Handler panicked");
            }
        }
    }

    debug!("Worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ShelfClass;
    use crate::queue::ChannelQueue;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Records every id it sees; fails or panics on request.
    #[derive(Default)]
    struct RecordingHandler {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl OrderHandler for RecordingHandler {
        fn name(&self) -> &'static str {
            "recording"
        }

        async fn handle(&self, order: Order) -> Result<(), PipelineError> {
            self.seen.lock().unwrap().push(order.id().0.clone());
            match order.name() {
                "fail" => Err(PipelineError::Handler("requested".into())),
                "panic" => panic!("requested"),
                _ => Ok(()),
            }
        }
    }

    fn order(id: &str, name: &str) -> Order {
        Order::new(id, name, ShelfClass::Hot, 100, 0.5)
    }

    async fn wait_for(handler: &RecordingHandler, count: usize) {
        for _ in 0..200 {
            if handler.seen.lock().unwrap().len() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("handler saw fewer than {count} orders");
    }

    #[tokio::test]
    async fn test_pool_survives_errors_and_panics() {
        let queue: Arc<dyn OrderQueue> = Arc::new(ChannelQueue::unbounded("test"));
        let handler = Arc::new(RecordingHandler::default());
        let cancel = CancellationToken::new();
        let pool = WorkerPool::spawn(1, queue.clone(), handler.clone(), cancel.clone());
        assert_eq!(pool.size(), 1);

        queue.enqueue(order("1", "fail")).unwrap();
        queue.enqueue(order("2", "panic")).unwrap();
        queue.enqueue(order("3", "ok")).unwrap();
        wait_for(&handler, 3).await;

        assert_eq!(*handler.seen.lock().unwrap(), vec!["1", "2", "3"]);

        cancel.cancel();
        pool.join().await.unwrap();
    }

    #[tokio::test]
    async fn test_closing_the_queue_stops_the_pool() {
        let queue: Arc<dyn OrderQueue> = Arc::new(ChannelQueue::unbounded("test"));
        let pool = WorkerPool::spawn(3, queue.clone(), Arc::new(RecordingHandler::default()), CancellationToken::new());

        queue.close();
        pool.join().await.unwrap();
    }
}
