//! Domain-specific error types following panic-free policy.

use thiserror::Error;

/// Errors that can occur while producing a tick value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TickError {
    /// The time format string contains an unsupported specifier
    #[error("Invalid time format {format:?}: {reason}")]
    InvalidFormat { format: String, reason: String },

    /// The source failed to render a value for this tick
    #[error("Failed to render tick {seq}: {reason}")]
    Render { seq: u64, reason: String },
}

/// Result type for tick operations.
pub type TickResult<T> = Result<T, TickError>;
