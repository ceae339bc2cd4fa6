use crate::clock::{Clock, SystemClock};
use crate::config::ServiceConfig;
use crate::lifecycle::LifecycleError;
use crate::pipeline::{DelaySource, DispatchHandler, Intake, ProcessingHandler, UniformDelay, WorkerPool};
use crate::queue::{ChannelQueue, OrderQueue};
use crate::shelf::{Reclaimer, ShelfAllocator};
use crate::stats::{Stats, StatsReporter};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// The main runtime orchestrator for the kitchen.
///
/// `KitchenSystem` is responsible for:
/// - **Lifecycle Management**: Starting and stopping every task in the system
/// - **Dependency Wiring**: Handing the shared allocator, stats and queues to the components that need them
///
/// # Architecture
///
/// A running kitchen consists of:
/// - **Two intake queues**, both fed by [`Intake`]
/// - **Processing pool**: places orders on shelves
/// - **Dispatch pool**: sends a courier for every order
/// - **Reclaimer**: sweeps expired orders on a timer
/// - **Stats reporter**: logs the counters on a timer
///
/// # Example
///
/// ```ignore
/// let system = KitchenSystem::start(ServiceConfig::default())?;
///
/// system.intake.submit_json(r#"{"id":"1","name":"Pho","temp":"hot","shelfLife":300,"decayRate":0.4}"#)?;
///
/// // Gracefully shut down when done
/// system.shutdown().await?;
/// ```
pub struct KitchenSystem {
    /// Entry point for new orders
    pub intake: Intake,

    /// The shelves
    pub allocator: Arc<ShelfAllocator>,

    /// Outcome counters shared by every component
    pub stats: Arc<Stats>,

    queues: [Arc<dyn OrderQueue>; 2],
    pools: Vec<WorkerPool>,

    /// Timer tasks (reclaimer, stats reporter) by name
    background: Vec<(&'static str, JoinHandle<()>)>,

    cancel: CancellationToken,
}

impl KitchenSystem {
    /// Starts a kitchen on the system clock with uniformly random courier delays.
    pub fn start(config: ServiceConfig) -> Result<Self, LifecycleError> {
        let delay = UniformDelay::new(config.dispatch_delay_low, config.dispatch_delay_high);
        Self::with_parts(config, Arc::new(SystemClock), Arc::new(delay))
    }

    /// Starts a kitchen with an explicit clock and delay source.
    ///
    /// This method:
    /// 1. Validates the configuration
    /// 2. Creates the queues, the allocator and the stats
    /// 3. Spawns both worker pools, the reclaimer and the stats reporter
    ///
    /// Must be called from within a tokio runtime.
    pub fn with_parts(
        config: ServiceConfig,
        clock: Arc<dyn Clock>,
        delay: Arc<dyn DelaySource>,
    ) -> Result<Self, LifecycleError> {
        config.validate()?;
        info!(?config, "Starting kitchen");

        let cancel = CancellationToken::new();
        let stats = Arc::new(Stats::new());
        let allocator = Arc::new(ShelfAllocator::new(clock.clone(), stats.clone()));

        let queue = |name: &'static str| -> Arc<dyn OrderQueue> {
            match config.queue_capacity {
                Some(capacity) => Arc::new(ChannelQueue::bounded(name, capacity)),
                None => Arc::new(ChannelQueue::unbounded(name)),
            }
        };
        let processing_queue = queue("processing");
        let dispatch_queue = queue("dispatch");

        let pools = vec![
            WorkerPool::spawn(
                config.processing_workers,
                processing_queue.clone(),
                Arc::new(ProcessingHandler::new(allocator.clone())),
                cancel.clone(),
            ),
            WorkerPool::spawn(
                config.dispatch_workers,
                dispatch_queue.clone(),
                Arc::new(DispatchHandler::new(allocator.clone(), delay, config.dispatch_retries)),
                cancel.clone(),
            ),
        ];

        let reclaimer = Reclaimer::new(allocator.clone(), config.reclamation_interval, cancel.clone());
        let reporter = StatsReporter::new(stats.clone(), config.stats_interval, cancel.clone());
        let background = vec![
            ("reclaimer", tokio::spawn(reclaimer.run())),
            ("stats", tokio::spawn(reporter.run())),
        ];

        let intake = Intake::new(processing_queue.clone(), dispatch_queue.clone(), clock, stats.clone());

        Ok(Self {
            intake,
            allocator,
            stats,
            queues: [processing_queue, dispatch_queue],
            pools,
            background,
            cancel,
        })
    }

    /// Waits until at least `count` orders have finished dispatch, successful or not.
    ///
    /// Every accepted order passes through the dispatch pool exactly once and
    /// is counted even if its courier panics, so this is how a caller knows the
    /// pipeline has drained.
    pub async fn wait_until_dispatched(&self, count: u64) {
        loop {
            let snapshot = self.stats.snapshot();
            if snapshot.dispatched + snapshot.failed_dispatch >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    /// Gracefully shuts down the entire system.
    ///
    /// This method:
    /// 1. Cancels every task; blocked fetches, courier delays and timer waits return promptly
    /// 2. Closes both queues so nothing more can be submitted
    /// 3. Waits for every task to finish
    ///
    /// Orders still queued or in flight are abandoned.
    ///
    /// # Returns
    ///
    /// - `Ok(())` if every task shut down cleanly
    /// - `Err(LifecycleError::TaskFailed)` for the first task that panicked; the
    ///   remaining tasks are still awaited
    pub async fn shutdown(self) -> Result<(), LifecycleError> {
        info!("Shutting down kitchen...");

        self.cancel.cancel();
        for queue in &self.queues {
            queue.close();
        }

        let mut first_failure = None;

        for pool in self.pools {
            let task = pool.name();
            if let Err(e) = pool.join().await {
                first_failure.get_or_insert(LifecycleError::TaskFailed {
                    task,
                    reason: e.to_string(),
                });
            }
        }

        for (task, handle) in self.background {
            if let Err(e) = handle.await {
                error!(task, error = %e, "Task failed");
                first_failure.get_or_insert(LifecycleError::TaskFailed {
                    task,
                    reason: e.to_string(),
                });
            }
        }

        match first_failure {
            Some(e) => Err(e),
            None => {
                info!(stats = %self.stats.snapshot(), "Kitchen shutdown complete.");
                Ok(())
            }
        }
    }
}
