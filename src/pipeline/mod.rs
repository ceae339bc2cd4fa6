//! The order pipeline: intake, worker pools, and the two order handlers.
//!
//! # Main Components
//!
//! - [`Intake`] - Ingestion entry point; feeds both queues
//! - [`WorkerPool`] - Fixed set of workers looping fetch -> handle
//! - [`ProcessingHandler`] - Places orders on shelves
//! - [`DispatchHandler`] - Simulates couriers picking orders up after a delay

pub mod dispatch;
pub mod error;
pub mod intake;
pub mod processing;
pub mod worker;

pub use dispatch::*;
pub use error::*;
pub use intake::*;
pub use processing::*;
pub use worker::*;
