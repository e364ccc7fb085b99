//! rdfweaver Connectors - batched relational sources
//!
//! This crate reads rows from SQL databases in fixed-size batches:
//! - PostgreSQL, MySQL and SQLite through the `sqlx` Any driver
//! - One background retrieval per source reference, shared by all consumers
//! - Dialect-aware quoting of dotted identifiers

pub mod batch_store;
pub mod config;
pub mod error;
pub mod pool;
pub mod query;
pub mod quoting;
pub mod relational;
pub mod row;

mod retrieval;

pub use batch_store::{BatchStore, RetrievalStatus, SourceSlot};
pub use config::{Driver, RetrievalConfig, ServerConfig};
pub use error::SourceError;
pub use pool::{catalog_statement, connect_pool};
pub use query::{prepare_count_query, prepare_query, QueryBuilder};
pub use quoting::{quote_identifiers, quote_identifiers_with, QuoteStyle};
pub use relational::RelationalSource;
