//! # Service Configuration
//!
//! [`ServiceConfig`] holds every tunable of a running kitchen. The defaults
//! describe a reasonable local run; the `kitchen` binary overrides them from
//! command-line flags or `KITCHEN_*` environment variables.

use std::time::Duration;
use thiserror::Error;

/// Configuration rejected by [`ServiceConfig::validate`].
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error("{pool} pool needs at least one worker")]
    NoWorkers { pool: &'static str },

    #[error("{field} must be greater than zero")]
    ZeroInterval { field: &'static str },

    #[error("dispatch delay bounds are reversed: low {low:?} > high {high:?}")]
    InvertedDelay { low: Duration, high: Duration },

    #[error("queue capacity must be greater than zero when set")]
    ZeroQueueCapacity,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    /// Workers placing orders on shelves.
    pub processing_workers: usize,
    /// Workers simulating couriers.
    pub dispatch_workers: usize,
    /// How often every shelf is swept for expired orders.
    pub reclamation_interval: Duration,
    /// Shortest courier travel time.
    pub dispatch_delay_low: Duration,
    /// Longest courier travel time.
    pub dispatch_delay_high: Duration,
    /// How often the stats snapshot is logged.
    pub stats_interval: Duration,
    /// Bound on each intake queue; `None` for unbounded.
    pub queue_capacity: Option<usize>,
    /// Extra pickup attempts after a miss.
    pub dispatch_retries: u32,
}

impl ServiceConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.processing_workers == 0 {
            return Err(ConfigError::NoWorkers { pool: "processing" });
        }
        if self.dispatch_workers == 0 {
            return Err(ConfigError::NoWorkers { pool: "dispatch" });
        }
        if self.reclamation_interval.is_zero() {
            return Err(ConfigError::ZeroInterval { field: "reclamation_interval" });
        }
        if self.stats_interval.is_zero() {
            return Err(ConfigError::ZeroInterval { field: "stats_interval" });
        }
        if self.dispatch_delay_low > self.dispatch_delay_high {
            return Err(ConfigError::InvertedDelay {
                low: self.dispatch_delay_low,
                high: self.dispatch_delay_high,
            });
        }
        if self.queue_capacity == Some(0) {
            return Err(ConfigError::ZeroQueueCapacity);
        }
        Ok(())
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        let workers = 2 * std::thread::available_parallelism().map_or(1, usize::from);
        Self {
            processing_workers: workers,
            dispatch_workers: workers,
            reclamation_interval: Duration::from_millis(1000),
            dispatch_delay_low: Duration::from_secs(2),
            dispatch_delay_high: Duration::from_secs(6),
            stats_interval: Duration::from_secs(60),
            queue_capacity: None,
            dispatch_retries: 0,
        }
    }
}
