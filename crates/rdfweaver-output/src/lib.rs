//! rdfweaver Output - destinations for finished graphs
//!
//! This crate persists a mapped [`Graph`]:
//! - Local files in any supported RDF format, never overwriting
//! - Remote graph stores over the SPARQL Graph Store Protocol

pub mod error;
pub mod factory;
pub mod file;
pub mod remote;

pub use error::OutputError;
pub use factory::{build_output, OutputDescriptor};
pub use file::{FileSink, FileTarget};
pub use remote::{RemoteSink, RemoteTarget};

use async_trait::async_trait;
use rdfweaver_core::Graph;

/// A destination that can persist a graph.
#[async_trait]
pub trait RdfOutput: Send + Sync {
    async fn save(&self, graph: &Graph) -> Result<(), OutputError>;

    /// Human-readable location, for logging.
    fn destination(&self) -> String;
}
