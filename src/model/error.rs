//! Error types for decoding orders at the ingestion boundary.

use thiserror::Error;

/// Errors raised while turning an inbound text representation into an [`Order`](crate::model::Order).
///
/// These never reach the pipeline: a listener that gets one rejects the request.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The payload is not valid JSON or does not have the order shape.
    #[error("Malformed order: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The payload parsed but a field violates an order invariant.
    #[error("Invalid order field `{field}`: {reason}")]
    InvalidField {
        field: &'static str,
        reason: String,
    },
}
