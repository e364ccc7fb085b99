//! Typed errors for the output crate.

use rdfweaver_core::CoreError;
use thiserror::Error;

/// Errors raised while persisting a graph.
#[derive(Debug, Error)]
pub enum OutputError {
    /// Directory or file creation, or writing, failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The graph could not be rendered.
    #[error(transparent)]
    Serialize(#[from] CoreError),

    /// The remote store could not be reached.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote store answered with a non-success status.
    #[error("remote store rejected upload with status {status}: {body}")]
    Remote { status: u16, body: String },

    /// The output descriptor is unusable.
    #[error("invalid output target: {0}")]
    InvalidTarget(String),
}
