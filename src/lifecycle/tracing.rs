//! # Observability & Tracing
//!
//! This module provides the tracing infrastructure for the whole kitchen.
//!
//! ## Overview
//!
//! The [`setup_tracing`] function initializes structured logging with the `tracing` crate.
//! Every worker runs inside a `worker` span carrying its `pool` and `worker_id`, and
//! placements run inside a `place` span carrying `order_id` and `class`, so each log line
//! can be traced back to the order and the task that produced it.
//!
//! ## Configuration
//!
//! - **Configurable log levels** via the `RUST_LOG` environment variable (default `info`)
//! - **Compact format** that hides the module prefix (`with_target(false)`)
//! - **Idempotent**: calling it twice (e.g. from several tests) is harmless
//!
//! ## What Gets Traced
//!
//! - **Task Lifecycle**: Pool, reclaimer and stats reporter startup and shutdown
//! - **Order Flow**: Placement, shelf moves, evictions, expirations, pickups
//! - **Errors**: Rejected submissions, exhausted placements, handler failures and panics
//!
//! ## Usage Examples
//!
//! ```bash
//! # Order outcomes and periodic stats
//! RUST_LOG=info cargo run
//!
//! # Every shelf add/remove and courier attempt
//! RUST_LOG=debug cargo run
//!
//! # Only the shelf layer
//! RUST_LOG=kitchen_shelves::shelf=debug cargo run
//! ```
//!
//! ## Workflow Trace Example
//!
//! **With `RUST_LOG=info`**:
//!
//! ```text
//! INFO worker: Order placed pool="processing" worker_id=0 order_id=a8cfcb76 name="Banana Split" shelf=frozen
//! INFO worker:pickup: Picked up pool="dispatch" worker_id=3 order_id=a8cfcb76 shelf=frozen
//! INFO worker: Order dispatched pool="dispatch" worker_id=3 order_id=a8cfcb76 name="Banana Split" attempt=0
//! INFO Stats received=132 processed=130 dispatched=117 discarded=2 failed_dispatch=13 expired=4
//! ```
pub fn setup_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    // A second call finds a subscriber already installed; keep the first one.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .try_init();
}
