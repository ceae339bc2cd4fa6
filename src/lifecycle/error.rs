//! Error types for starting and stopping the kitchen.

use crate::config::ConfigError;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum LifecycleError {
    /// The configuration failed validation; nothing was started.
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// A background task panicked or was aborted.
    #[error("{task} task failed: {reason}")]
    TaskFailed { task: &'static str, reason: String },
}
