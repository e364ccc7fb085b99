//! rdfweaver Core - shared model for relational-to-RDF weaving
//!
//! This crate defines the types every other rdfweaver crate agrees on:
//! - Source references, rows and batches handed out by input sources
//! - The in-memory RDF graph and its serialization formats
//! - The `InputSource` and `EntityMapper` capabilities

pub mod error;
pub mod format;
pub mod graph;
pub mod mapping;
pub mod model;

pub use error::CoreError;
pub use format::RdfFormat;
pub use graph::{named_node, Graph, Literal, NamedNode, Triple};
pub use mapping::{DirectMapper, EntityMapper};
pub use model::{Batch, Row, SourceRef};

use async_trait::async_trait;
use std::sync::Arc;

/// A source of rows that hands them out in fixed-size, indexed batches.
///
/// Consumers call [`InputSource::calculate_num_of_batches`] once and then
/// request batches `0..n` in order.
#[async_trait]
pub trait InputSource: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Number of batches a full retrieval of `source` will produce.
    async fn calculate_num_of_batches(&self, source: &SourceRef) -> Result<usize, Self::Error>;

    /// Return batch `batch_id` of `source`, waiting for it if necessary.
    async fn get_entity_record(
        &self,
        source: &SourceRef,
        batch_id: usize,
    ) -> Result<Arc<Batch>, Self::Error>;
}
