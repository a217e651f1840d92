//! Error types for the Bloom filter family

use thiserror::Error;

/// Errors that can occur while building, merging or (de)serializing filters
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("Invalid false positive rate: {fpr} (must be strictly between 0 and 1)")]
    InvalidFPR { fpr: f64 },

    #[error("Invalid capacity: expected element count must be at least 1")]
    InvalidCapacity,

    #[error("Invalid filter parameters: {0}")]
    InvalidParameters(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Unknown filter type tag: {tag}")]
    UnknownFilterType { tag: u8 },

    #[error("Unexpected filter type: expected {expected}, got {actual}")]
    UnexpectedFilterType {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Unsupported hash policy: {name:?}")]
    UnsupportedPolicy { name: String },

    #[error("Incompatible merge: {0}")]
    IncompatibleMerge(String),
}

impl FilterError {
    /// True for errors caused by invalid sizing input
    pub fn is_construction(&self) -> bool {
        matches!(
            self,
            FilterError::InvalidFPR { .. }
                | FilterError::InvalidCapacity
                | FilterError::InvalidParameters(_)
        )
    }

    /// True for errors caused by malformed or truncated serialized input
    pub fn is_serialization(&self) -> bool {
        matches!(
            self,
            FilterError::SerializationError(_)
                | FilterError::UnknownFilterType { .. }
                | FilterError::UnexpectedFilterType { .. }
        )
    }
}

impl From<bincode::Error> for FilterError {
    fn from(err: bincode::Error) -> Self {
        FilterError::SerializationError(err.to_string())
    }
}
