//! Source references, rows and batches.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies what to retrieve from a relational source.
///
/// Used as a lookup key for retrieval state, so equality and hashing are by
/// value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceRef {
    /// A table or view name, optionally schema-qualified (`dbo.Customers`).
    Table(String),
    /// A caller-supplied SQL statement.
    Query(String),
}

impl SourceRef {
    pub fn table(name: impl Into<String>) -> Self {
        SourceRef::Table(name.into())
    }

    pub fn query(sql: impl Into<String>) -> Self {
        SourceRef::Query(sql.into())
    }

    /// The raw table name or query text.
    pub fn payload(&self) -> &str {
        match self {
            SourceRef::Table(name) => name,
            SourceRef::Query(sql) => sql,
        }
    }
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceRef::Table(name) => write!(f, "table '{}'", name),
            SourceRef::Query(sql) => write!(f, "query '{}'", sql),
        }
    }
}

/// One retrieved record: column name to string value, in result-set column
/// order. SQL `NULL` is stored as `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    columns: Vec<(String, Option<String>)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            columns: Vec::with_capacity(capacity),
        }
    }

    /// Append a column. Column order is insertion order.
    pub fn push(&mut self, name: impl Into<String>, value: Option<String>) {
        self.columns.push((name.into(), value));
    }

    /// Value of the first column called `name`, or `None` when the column is
    /// missing or `NULL`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.columns
            .iter()
            .find(|(column, _)| column == name)
            .and_then(|(_, value)| value.as_deref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.columns.iter().any(|(column, _)| column == name)
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.columns
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_deref()))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl<K, V> FromIterator<(K, Option<V>)> for Row
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, Option<V>)>>(iter: I) -> Self {
        Self {
            columns: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.map(Into::into)))
                .collect(),
        }
    }
}

/// A closed, ordered group of rows: the unit of producer/consumer handoff.
///
/// Batches are immutable once built; sources share them as `Arc<Batch>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    id: usize,
    rows: Vec<Row>,
}

impl Batch {
    pub fn new(id: usize, rows: Vec<Row>) -> Self {
        Self { id, rows }
    }

    /// Position of this batch in its retrieval, starting at 0.
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Row> {
        self.rows.iter()
    }
}

impl<'a> IntoIterator for &'a Batch {
    type Item = &'a Row;
    type IntoIter = std::slice::Iter<'a, Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
