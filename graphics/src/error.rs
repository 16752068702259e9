//! Graphics error types.

use std::fmt;

/// Errors that can occur in the graphics system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphicsError {
    /// Failed to create a resource.
    ResourceCreationFailed(String),
    /// A descriptor failed validation.
    InvalidDescriptor(String),
    /// A handle from a previous graph build was used after the registry
    /// was rebuilt.
    StaleHandle,
    /// The command list pool reached its growth limit.
    PoolExhausted,
    /// An internal error occurred.
    Internal(String),
}

impl fmt::Display for GraphicsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ResourceCreationFailed(msg) => write!(f, "resource creation failed: {msg}"),
            Self::InvalidDescriptor(msg) => write!(f, "invalid descriptor: {msg}"),
            Self::StaleHandle => write!(f, "stale resource handle"),
            Self::PoolExhausted => write!(f, "command list pool exhausted"),
            Self::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for GraphicsError {}
