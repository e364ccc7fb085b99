//! Typed errors for the core crate.

use thiserror::Error;

/// Errors raised while building or serializing a graph.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A row could not be turned into triples.
    #[error("mapping failed: {0}")]
    Mapping(String),

    /// The graph could not be rendered in the requested format.
    #[error("serialization failed: {0}")]
    Serialize(String),

    /// Writing serialized output failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Serialize(e.to_string())
    }
}
