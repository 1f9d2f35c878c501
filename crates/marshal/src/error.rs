//! Error types for hostbridge-marshal

use thiserror::Error;

/// Result type alias for marshalling operations
pub type Result<T> = std::result::Result<T, MarshalError>;

/// Error types for the boundary marshalling layer
#[derive(Debug, Error)]
pub enum MarshalError {
    /// A leaf's runtime type disagrees with the element type selected by
    /// dispatch; the whole conversion aborts, never a partial result
    #[error("Type mismatch: expected {expected} leaf, got {found}")]
    TypeMismatch {
        /// Element type the dispatch selected
        expected: &'static str,
        /// Host-side type of the offending leaf
        found: &'static str,
    },

    /// Buffer descriptor rank outside the supported 1..=3
    #[error("Unsupported buffer rank: {0}")]
    UnsupportedRank(usize),

    /// Interchange payload is malformed
    #[error("Interchange decode error: {0}")]
    Decode(String),

    /// Native-side matrix error
    #[error(transparent)]
    Matrix(#[from] hostbridge_core::Error),
}
