//! Shelf storage, the placement cascade, and expired-order reclamation.
//!
//! # Main Components
//!
//! - [`Shelf`] - Capacity-bounded concurrent container for one shelf class
//! - [`ShelfAllocator`] - Owns one shelf per class; places and picks up orders
//! - [`Reclaimer`] - Periodic task that sweeps expired orders off every shelf

pub mod allocator;
pub mod error;
pub mod reclaimer;
pub mod store;

pub use allocator::*;
pub use error::*;
pub use reclaimer::*;
pub use store::*;
