//! SQL statements for a source reference.

use rdfweaver_core::SourceRef;

use crate::error::SourceError;
use crate::quoting::{quote_identifiers_with, QuoteStyle};

/// Builds the retrieval and count statements for a [`SourceRef`].
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryBuilder {
    style: QuoteStyle,
}

impl QueryBuilder {
    pub fn new(style: QuoteStyle) -> Self {
        Self { style }
    }

    /// `SELECT * FROM <table>` for tables, the query itself for queries.
    /// Dotted identifiers are quoted in both cases.
    pub fn prepare_query(&self, source: &SourceRef) -> Result<String, SourceError> {
        let payload = payload(source)?;
        let sql = match source {
            SourceRef::Table(_) => format!("SELECT * FROM {}", payload),
            SourceRef::Query(_) => payload.to_string(),
        };
        Ok(quote_identifiers_with(&sql, self.style))
    }

    /// Statement returning the total row count as a single `total_rows` column.
    pub fn prepare_count_query(&self, source: &SourceRef) -> Result<String, SourceError> {
        let payload = payload(source)?;
        let sql = match source {
            SourceRef::Table(_) => format!("SELECT COUNT(*) AS total_rows FROM {}", payload),
            SourceRef::Query(_) => format!(
                "SELECT COUNT(*) AS total_rows FROM ({}) AS t1",
                payload.trim_end_matches(|c: char| c == ';' || c.is_whitespace())
            ),
        };
        Ok(quote_identifiers_with(&sql, self.style))
    }
}

/// [`QueryBuilder::prepare_query`] with bracket quoting.
pub fn prepare_query(source: &SourceRef) -> Result<String, SourceError> {
    QueryBuilder::default().prepare_query(source)
}

/// [`QueryBuilder::prepare_count_query`] with bracket quoting.
pub fn prepare_count_query(source: &SourceRef) -> Result<String, SourceError> {
    QueryBuilder::default().prepare_count_query(source)
}

fn payload(source: &SourceRef) -> Result<&str, SourceError> {
    let payload = source.payload().trim();
    if payload.is_empty() {
        return Err(SourceError::InvalidReference(format!(
            "empty payload for {}",
            match source {
                SourceRef::Table(_) => "table reference",
                SourceRef::Query(_) => "query reference",
            }
        )));
    }
    Ok(payload)
}
