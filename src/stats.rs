//! # Pipeline Statistics
//!
//! [`Stats`] is a small set of independent atomic counters owned by the running
//! system and handed to every component that reports outcomes. Nothing here is
//! global: tests build their own `Stats` and read it back with [`Stats::snapshot`].
//!
//! [`StatsReporter`] periodically logs a snapshot so operators can follow the
//! pipeline from the process logs.

use serde::Serialize;
use std::fmt::Display;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Increment-only outcome counters.
#[derive(Debug, Default)]
pub struct Stats {
    received: AtomicU64,
    processed: AtomicU64,
    dispatched: AtomicU64,
    failed_dispatch: AtomicU64,
    discarded: AtomicU64,
    expired: AtomicU64,
}

/// Point-in-time copy of [`Stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub received: u64,
    pub processed: u64,
    pub dispatched: u64,
    pub failed_dispatch: u64,
    pub discarded: u64,
    pub expired: u64,
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    /// An order reached the ingestion entry point.
    pub fn record_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    /// An order was placed on a shelf.
    pub fn record_processed(&self) {
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    /// A courier picked an order up.
    pub fn record_dispatched(&self) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
    }

    /// A courier arrived and the order was not on any shelf.
    pub fn record_failed_dispatch(&self) {
        self.failed_dispatch.fetch_add(1, Ordering::Relaxed);
    }

    /// An order was evicted or could not be placed at all.
    pub fn record_discarded(&self) {
        self.discarded.fetch_add(1, Ordering::Relaxed);
    }

    /// `count` orders decayed to zero freshness and were swept away.
    pub fn record_expired(&self, count: u64) {
        self.expired.fetch_add(count, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            received: self.received.load(Ordering::Relaxed),
            processed: self.processed.load(Ordering::Relaxed),
            dispatched: self.dispatched.load(Ordering::Relaxed),
            failed_dispatch: self.failed_dispatch.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
            expired: self.expired.load(Ordering::Relaxed),
        }
    }

    /// Zeroes every counter.
    pub fn reset(&self) {
        for counter in [
            &self.received,
            &self.processed,
            &self.dispatched,
            &self.failed_dispatch,
            &self.discarded,
            &self.expired,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

impl Display for StatsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "received={} processed={} dispatched={} discarded={} failed_dispatch={} expired={}",
            self.received,
            self.processed,
            self.dispatched,
            self.discarded,
            self.failed_dispatch,
            self.expired
        )
    }
}

/// Background task that logs a [`StatsSnapshot`] on a fixed interval.
pub struct StatsReporter {
    stats: Arc<Stats>,
    interval: Duration,
    cancel: CancellationToken,
}

impl StatsReporter {
    pub fn new(stats: Arc<Stats>, interval: Duration, cancel: CancellationToken) -> Self {
        Self {
            stats,
            interval,
            cancel,
        }
    }

    /// Logs until cancelled, then logs one final snapshot.
    pub async fn run(self) {
        info!(interval_ms = self.interval.as_millis() as u64, "Stats reporter started");

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let snapshot = self.stats.snapshot();
                    info!(
                        received = snapshot.received,
                        processed = snapshot.processed,
                        dispatched = snapshot.dispatched,
                        discarded = snapshot.discarded,
                        failed_dispatch = snapshot.failed_dispatch,
                        expired = snapshot.expired,
                        "Stats"
                    );
                }
            }
        }

        info!(stats = %self.stats.snapshot(), "Stats reporter stopped");
    }
}
