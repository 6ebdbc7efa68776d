//! Error types for the index

use thiserror::Error;

/// Result type alias for index operations
pub type Result<T> = std::result::Result<T, AnnError>;

/// Error types that can occur in index operations
#[derive(Error, Debug)]
pub enum AnnError {
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Invalid state: {reason}")]
    InvalidState { reason: String },

    #[error("Item id {id} out of range (item count: {count})")]
    OutOfRangeId { id: u32, count: usize },

    #[error("Format error: {0}")]
    FormatError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl AnnError {
    /// Shorthand for an `InvalidState` with a formatted reason.
    pub(crate) fn invalid_state(reason: impl Into<String>) -> Self {
        AnnError::InvalidState {
            reason: reason.into(),
        }
    }
}
