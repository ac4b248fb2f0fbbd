//! Error kinds surfaced by binding, decoding and column operations.
//!
//! Every error is reported synchronously to the caller of the request that
//! produced it. Nothing in this crate retries or repairs on its own: a corrupt
//! register cell stays corrupt until it is explicitly overwritten.

use thiserror::Error;

use crate::types::ElementType;

/// Opaque failure raised by a storage collaborator (timeout, unavailability, ...).
pub type StorageError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result alias used across the crate.
pub type Result<T, E = HllError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum HllError {
    #[error("Invalid hyperloglog literal for {column}: value {value} is not of type {expected}")]
    TypeMismatch {
        column: String,
        value: String,
        expected: ElementType,
    },

    #[error("Invalid hyperloglog literal for {column}: bind variables are not supported inside hyperloglog literals")]
    BindMarkerUnsupported { column: String },

    #[error("null is not supported inside hyperloglog literals (column {column})")]
    NullElement { column: String },

    #[error("HyperLogLog value is too long. Values are limited to {limit} bytes but {len} bytes value provided")]
    ValueTooLarge { len: usize, limit: usize },

    #[error("precision {0} is out of range, must be in [4; 16]")]
    PrecisionOutOfRange(i64),

    #[error("cannot merge sketches of precision {left} and {right}")]
    PrecisionMismatch { left: u8, right: u8 },

    #[error("cannot alter precision of hyperloglog column {column} from {from} to {to}")]
    PrecisionChange { column: String, from: u8, to: u8 },

    #[error("invalid value {value:?} for option {name}")]
    InvalidOption { name: String, value: String },

    #[error("corrupt packed sketch: {0}")]
    CorruptSketch(String),

    #[error("unsupported packed sketch version {0}")]
    UnsupportedVersion(u8),

    #[error("storage failure: {0}")]
    Storage(#[source] StorageError),
}

impl HllError {
    /// Wrap a collaborator failure without altering it.
    pub fn storage(err: impl Into<StorageError>) -> Self {
        HllError::Storage(err.into())
    }
}
