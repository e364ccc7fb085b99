//! In-memory RDF graph.
//!
//! Terms, triples and the graph itself are `oxrdf` types; literal subjects
//! and non-IRI predicates are ruled out by the type system.

pub use oxrdf::vocab::rdf::TYPE as RDF_TYPE;
pub use oxrdf::{BlankNode, Graph, Literal, NamedNode, Subject, Triple, TripleRef};

use crate::error::CoreError;

/// Parse `iri` as an absolute IRI.
pub fn named_node(iri: impl Into<String>) -> Result<NamedNode, CoreError> {
    let iri = iri.into();
    NamedNode::new(iri.as_str()).map_err(|e| CoreError::Mapping(format!("invalid IRI <{}>: {}", iri, e)))
}

/// Triples of `graph` in N-Triples line order, so serialized output does not
/// depend on insertion order.
pub fn sorted_triples(graph: &Graph) -> Vec<TripleRef<'_>> {
    let mut triples: Vec<TripleRef<'_>> = graph.iter().collect();
    triples.sort_by_cached_key(|t| t.to_string());
    triples
}
