//! Row-to-triple mapping.

use tracing::debug;
use url::Url;
use uuid::Uuid;

use crate::error::CoreError;
use crate::graph::{named_node, BlankNode, Graph, Literal, NamedNode, Subject, Triple, RDF_TYPE};
use crate::model::{Batch, Row, SourceRef};

/// Turns retrieved rows into triples.
pub trait EntityMapper: Send + Sync {
    /// Map every row of `batch` into `graph`. Returns the number of triples
    /// that were new to the graph.
    fn map_batch(
        &self,
        source: &SourceRef,
        batch: &Batch,
        graph: &mut Graph,
    ) -> Result<usize, CoreError>;
}

/// Direct mapping of one source onto one class.
///
/// For a base `http://example.com/` and class `Customer`, a row with key `7`
/// becomes `<http://example.com/Customer/7>`, typed as
/// `<http://example.com/Customer>`, with one `<http://example.com/Customer#col>`
/// literal per non-null column. Rows without a key value get a fresh blank node.
#[derive(Debug, Clone)]
pub struct DirectMapper {
    class: String,
    class_iri: Url,
    key_column: Option<String>,
}

impl DirectMapper {
    pub fn new(
        base_iri: &str,
        class: impl Into<String>,
        key_column: Option<String>,
    ) -> Result<Self, CoreError> {
        let class = class.into();
        if class.trim().is_empty() {
            return Err(CoreError::Mapping("class name must be set".into()));
        }

        let mut class_iri = Url::parse(base_iri)
            .map_err(|e| CoreError::Mapping(format!("invalid base IRI '{}': {}", base_iri, e)))?;
        class_iri.set_query(None);
        class_iri.set_fragment(None);
        class_iri
            .path_segments_mut()
            .map_err(|_| CoreError::Mapping(format!("base IRI '{}' cannot have a path", base_iri)))?
            .pop_if_empty()
            .push(&class);

        Ok(Self {
            class,
            class_iri,
            key_column: key_column.filter(|k| !k.trim().is_empty()),
        })
    }

    /// IRI used as the `rdf:type` of every mapped row.
    pub fn class_iri(&self) -> &str {
        self.class_iri.as_str()
    }

    fn subject(&self, row: &Row) -> Result<Subject, CoreError> {
        let key = self
            .key_column
            .as_deref()
            .and_then(|column| row.get(column));
        match key {
            Some(key) => {
                let mut iri = self.class_iri.clone();
                // class_iri was built with a path, so segments are available
                if let Ok(mut segments) = iri.path_segments_mut() {
                    segments.push(key);
                }
                Ok(named_node(String::from(iri))?.into())
            }
            None => {
                let label = format!("{}_{}", blank_prefix(&self.class), Uuid::new_v4().simple());
                let node = BlankNode::new(label.as_str())
                    .map_err(|e| CoreError::Mapping(format!("invalid blank node '{}': {}", label, e)))?;
                Ok(node.into())
            }
        }
    }

    fn predicate(&self, column: &str) -> Result<NamedNode, CoreError> {
        let mut iri = self.class_iri.clone();
        iri.set_fragment(Some(column));
        named_node(String::from(iri))
    }
}

impl EntityMapper for DirectMapper {
    fn map_batch(
        &self,
        source: &SourceRef,
        batch: &Batch,
        graph: &mut Graph,
    ) -> Result<usize, CoreError> {
        let before = graph.len();
        let class = named_node(self.class_iri.as_str())?;

        for row in batch {
            let subject = self.subject(row)?;
            graph.insert(&Triple::new(subject.clone(), RDF_TYPE, class.clone()));
            for (column, value) in row.columns() {
                if let Some(value) = value {
                    graph.insert(&Triple::new(
                        subject.clone(),
                        self.predicate(column)?,
                        Literal::new_simple_literal(value),
                    ));
                }
            }
        }

        let added = graph.len() - before;
        debug!(
            "Mapped batch {} of {} ({} rows, {} new triples)",
            batch.id(),
            source,
            batch.len(),
            added
        );
        Ok(added)
    }
}

fn blank_prefix(class: &str) -> String {
    class
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}
