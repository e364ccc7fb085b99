//! RDF serialization formats.
//!
//! Sinks treat a format as an opaque token; this module owns how a
//! [`Graph`] is rendered for each one. The line formats and Turtle go
//! through `oxrdfio`; RDF/JSON is built with `serde_json`.

use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;
use std::str::FromStr;

use oxrdf::vocab::xsd;
use oxrdf::{GraphNameRef, SubjectRef, TermRef};
use oxrdfio::{RdfFormat as OxFormat, RdfSerializer};
use serde_json::{json, Value};

use crate::error::CoreError;
use crate::graph::{sorted_triples, Graph};

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RdfFormat {
    #[default]
    NTriples,
    /// N-Quads with every triple in the default graph.
    NQuads,
    Turtle,
    /// RDF 1.1 JSON alternate serialization (RDF/JSON).
    RdfJson,
}

impl RdfFormat {
    /// File extension without the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            RdfFormat::NTriples => "nt",
            RdfFormat::NQuads => "nq",
            RdfFormat::Turtle => "ttl",
            RdfFormat::RdfJson => "rj",
        }
    }

    pub fn media_type(&self) -> &'static str {
        match self {
            RdfFormat::NTriples => "application/n-triples",
            RdfFormat::NQuads => "application/n-quads",
            RdfFormat::Turtle => "text/turtle",
            RdfFormat::RdfJson => "application/rdf+json",
        }
    }

    /// Serialize `graph` into `out`.
    pub fn write<W: Write>(&self, graph: &Graph, out: &mut W) -> Result<(), CoreError> {
        match self {
            RdfFormat::NTriples => write_with_oxrdfio(OxFormat::NTriples, graph, out),
            RdfFormat::NQuads => write_with_oxrdfio(OxFormat::NQuads, graph, out),
            RdfFormat::Turtle => write_with_oxrdfio(OxFormat::Turtle, graph, out),
            RdfFormat::RdfJson => write_rdf_json(graph, out),
        }
    }

    /// Serialize `graph` into a byte buffer.
    pub fn to_bytes(&self, graph: &Graph) -> Result<Vec<u8>, CoreError> {
        let mut buf = Vec::new();
        self.write(graph, &mut buf)?;
        Ok(buf)
    }
}

impl fmt::Display for RdfFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RdfFormat::NTriples => "ntriples",
            RdfFormat::NQuads => "nquads",
            RdfFormat::Turtle => "turtle",
            RdfFormat::RdfJson => "rdfjson",
        };
        f.write_str(name)
    }
}

impl FromStr for RdfFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "nt" | "ntriples" | "n-triples" => Ok(RdfFormat::NTriples),
            "nq" | "nquads" | "n-quads" => Ok(RdfFormat::NQuads),
            "ttl" | "turtle" => Ok(RdfFormat::Turtle),
            "rj" | "rdfjson" | "rdf/json" => Ok(RdfFormat::RdfJson),
            other => Err(format!("unsupported RDF format: {}", other)),
        }
    }
}

// ---------------------------------------------------------------------------
// N-Triples, N-Quads, Turtle
// ---------------------------------------------------------------------------

fn write_with_oxrdfio<W: Write>(
    format: OxFormat,
    graph: &Graph,
    out: &mut W,
) -> Result<(), CoreError> {
    let mut serializer = RdfSerializer::from_format(format).for_writer(out);
    for triple in sorted_triples(graph) {
        serializer.serialize_quad(triple.in_graph(GraphNameRef::DefaultGraph))?;
    }
    serializer.finish()?;
    Ok(())
}

// ---------------------------------------------------------------------------
// RDF/JSON
// ---------------------------------------------------------------------------

fn write_rdf_json<W: Write>(graph: &Graph, out: &mut W) -> Result<(), CoreError> {
    let mut subjects: BTreeMap<String, BTreeMap<&str, Vec<Value>>> = BTreeMap::new();
    for triple in sorted_triples(graph) {
        let key = match triple.subject {
            SubjectRef::NamedNode(node) => node.as_str().to_string(),
            other => other.to_string(),
        };
        subjects
            .entry(key)
            .or_default()
            .entry(triple.predicate.as_str())
            .or_default()
            .push(object_to_json(triple.object));
    }
    serde_json::to_writer_pretty(&mut *out, &subjects)?;
    writeln!(out)?;
    Ok(())
}

fn object_to_json(term: TermRef<'_>) -> Value {
    match term {
        TermRef::NamedNode(node) => json!({ "type": "uri", "value": node.as_str() }),
        TermRef::Literal(literal) => {
            let mut value = json!({ "type": "literal", "value": literal.value() });
            if let Some(language) = literal.language() {
                value["lang"] = json!(language);
            } else if literal.datatype() != xsd::STRING {
                value["datatype"] = json!(literal.datatype().as_str());
            }
            value
        }
        other => json!({ "type": "bnode", "value": other.to_string() }),
    }
}
