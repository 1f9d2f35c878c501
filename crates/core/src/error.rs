//! Error types for hostbridge-core

use crate::elem::DataType;
use thiserror::Error;

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the native-side data model
#[derive(Debug, Error)]
pub enum Error {
    /// Matrix dimensions are not representable
    #[error("Invalid matrix shape: {0:?}")]
    InvalidShape(Vec<usize>),

    /// Composite element types need at least one channel
    #[error("Invalid channel count: {0}")]
    InvalidChannels(usize),

    /// Operation requires contiguous row-major storage
    #[error("Matrix is not contiguous: step {step} bytes, row width {row_bytes} bytes")]
    NonContiguous {
        /// Row stride in bytes
        step: usize,
        /// Packed row width in bytes
        row_bytes: usize,
    },

    /// Element type has no host-side representation
    #[error("Unsupported element type: {0:?}")]
    UnsupportedElementType(DataType),

    /// Buffer length disagrees with the described shape
    #[error("Matrix size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch {
        /// Expected byte count
        expected: usize,
        /// Actual byte count
        actual: usize,
    },

    /// Typed view of the storage could not be formed
    #[error("Storage cast failed: {0}")]
    Cast(String),
}
