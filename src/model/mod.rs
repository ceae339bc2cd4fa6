//! Pure data structures: the perishable [`Order`] and the [`ShelfClass`] it belongs to.

pub mod error;
pub mod order;
pub mod shelf_class;

pub use error::*;
pub use order::*;
pub use shelf_class::*;
