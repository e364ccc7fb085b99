//! Typed errors for the connectors crate.

use std::time::Duration;
use thiserror::Error;

/// Errors raised by relational sources.
///
/// `Clone` so that a retrieval failure recorded once can be handed to every
/// waiting consumer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    /// The source reference payload is empty or malformed.
    #[error("invalid source reference: {0}")]
    InvalidReference(String),

    /// Server configuration is missing a required field or is inconsistent.
    #[error("config error: {0}")]
    Config(String),

    /// A connection could not be opened or borrowed.
    #[error("connection failed: {0}")]
    Connection(String),

    /// A query failed or the cursor broke mid-read.
    #[error("data access failed: {0}")]
    DataAccess(String),

    /// The retrieval finished without producing the requested batch.
    #[error("batch {batch_id} not found: retrieval finished after {produced} batches")]
    BatchNotFound { batch_id: usize, produced: usize },

    /// No answer for the requested batch within the wait ceiling.
    #[error("timed out after {waited:?} waiting for batch {batch_id}")]
    RetrievalTimeout { batch_id: usize, waited: Duration },
}

impl SourceError {
    pub(crate) fn connection(e: sqlx::Error) -> Self {
        SourceError::Connection(e.to_string())
    }

    pub(crate) fn catalog(e: sqlx::Error) -> Self {
        SourceError::Connection(format!("cannot select database: {}", e))
    }

    pub(crate) fn data_access(e: sqlx::Error) -> Self {
        SourceError::DataAccess(e.to_string())
    }
}
