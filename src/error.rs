//! Error types for Fabric encoding.

use crate::types::Kind;

/// Crate-wide result alias.
pub type Result<T, E = FabricError> = std::result::Result<T, E>;

/// Errors that can occur while marshaling a value.
#[derive(Debug, thiserror::Error)]
pub enum FabricError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("unsupported marshal type {0}")]
    Unsupported(Kind),

    #[error("unsupported array element type {0}")]
    UnsupportedElement(Kind),

    #[error("kind mismatch: expected {expected}, found {found}")]
    KindMismatch { expected: Kind, found: Kind },

    #[error("codec error: {0}")]
    Codec(String),

    #[error("nesting depth exceeded limit of {limit}")]
    DepthExceeded { limit: usize },
}

impl FabricError {
    /// Wraps any displayable error as a codec error.
    pub fn codec(e: impl std::fmt::Display) -> Self {
        Self::Codec(e.to_string())
    }
}
