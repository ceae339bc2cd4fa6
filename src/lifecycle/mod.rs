//! Runtime orchestration and lifecycle management.
//!
//! This module contains the infrastructure for running a kitchen:
//!
//! - **Task lifecycle management**: Starting, wiring, and shutting down the worker pools and timers
//! - **Observability setup**: Initializing tracing and logging
//!
//! # Main Components
//!
//! - [`KitchenSystem`] - The orchestrator that owns every running task and its shared state
//! - [`setup_tracing`] - Initializes the tracing/logging infrastructure

pub mod error;
pub mod kitchen;
pub mod tracing;

pub use error::*;
pub use kitchen::*;
pub use tracing::*;
