//! Error types for the worker pipeline.

use crate::queue::QueueError;
use crate::shelf::AllocationError;
use std::any::Any;
use thiserror::Error;

/// Failures local to handling a single order.
///
/// A worker logs these and moves on to the next item; they never stop a pool.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PipelineError {
    /// No shelf could take the order.
    #[error(transparent)]
    Allocation(#[from] AllocationError),

    /// The queue could not produce or accept an item.
    #[error(transparent)]
    Queue(#[from] QueueError),

    /// A handler reported a failure of its own.
    #[error("Handler failed: {0}")]
    Handler(String),

    /// A handler or sweep panicked; the message is the panic payload.
    #[error("Panicked: {0}")]
    Panicked(String),
}

impl PipelineError {
    /// Converts a caught panic payload into an error carrying its message.
    pub fn from_panic(payload: &(dyn Any + Send)) -> Self {
        let message = if let Some(message) = payload.downcast_ref::<&'static str>() {
            (*message).to_string()
        } else if let Some(message) = payload.downcast_ref::<String>() {
            message.clone()
        } else {
            "unknown panic payload".to_string()
        };
        PipelineError::Panicked(message)
    }
}
