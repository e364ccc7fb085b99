//! Command-line arguments.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use rdfweaver_connectors::{Driver, ServerConfig};
use rdfweaver_core::{RdfFormat, SourceRef};
use rdfweaver_output::{FileTarget, OutputDescriptor, RemoteTarget};

#[derive(Parser, Debug)]
#[command(name = "rdfweaver")]
#[command(about = "Map relational data to RDF and store the resulting graph")]
#[command(version)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(flatten)]
    pub server: ServerArgs,

    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub mapping: MappingArgs,

    /// Rows per batch (overrides RDFWEAVER_BATCH_ROWS)
    #[arg(long)]
    pub batch_rows: Option<usize>,

    #[command(subcommand)]
    pub command: Command,
}

/// Source database connection.
#[derive(Args, Debug)]
pub struct ServerArgs {
    /// Database engine: postgres, mysql or sqlite
    #[arg(long, env = "RDFWEAVER_DRIVER")]
    pub driver: Driver,

    /// Server host name, or the database file for sqlite
    #[arg(long, env = "RDFWEAVER_HOST")]
    pub host: String,

    /// Server port (defaults to the engine's standard port)
    #[arg(long, env = "RDFWEAVER_PORT")]
    pub port: Option<u16>,

    #[arg(long, env = "RDFWEAVER_USER", default_value = "")]
    pub user: String,

    #[arg(long, env = "RDFWEAVER_PASSWORD", default_value = "", hide_env_values = true)]
    pub password: String,

    /// Database (catalog) to read from
    #[arg(long, env = "RDFWEAVER_DATABASE")]
    pub database: Option<String>,

    /// Maximum pooled connections
    #[arg(long, default_value_t = 5)]
    pub pool_size: u32,
}

impl ServerArgs {
    pub fn to_config(&self) -> ServerConfig {
        let port = self.port.unwrap_or_else(|| self.driver.default_port());
        let mut config = ServerConfig::new(
            self.driver,
            self.host.clone(),
            port,
            self.user.clone(),
            self.password.clone(),
        );
        config.database = self.database.clone();
        config.pool_size = self.pool_size;
        config
    }
}

/// What to read: exactly one of a table or a query.
#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub struct SourceArgs {
    /// Table or view name, optionally schema-qualified
    #[arg(long)]
    pub table: Option<String>,

    /// SQL query whose result set is mapped
    #[arg(long)]
    pub query: Option<String>,
}

impl SourceArgs {
    pub fn source_ref(&self) -> SourceRef {
        match (&self.table, &self.query) {
            (Some(table), _) => SourceRef::table(table.clone()),
            (None, Some(query)) => SourceRef::query(query.clone()),
            (None, None) => SourceRef::table(String::new()),
        }
    }
}

/// Direct mapping settings.
#[derive(Args, Debug)]
pub struct MappingArgs {
    /// Base IRI for generated subjects, classes and predicates
    #[arg(long, default_value = "http://example.com/")]
    pub base_iri: String,

    /// Class name given to every mapped row
    #[arg(long)]
    pub class: String,

    /// Column whose value identifies a row; rows without it become blank nodes
    #[arg(long)]
    pub key: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Choose where the mapped graph is stored
    Output {
        #[command(subcommand)]
        target: OutputTarget,
    },
}

#[derive(Subcommand, Debug)]
pub enum OutputTarget {
    /// Write to a local file
    File {
        /// Output directory, created if missing
        #[arg(long, default_value = ".")]
        dir: PathBuf,

        /// File name; the format's extension is added when missing
        #[arg(long, default_value = "rdfOutput")]
        name: String,

        /// RDF format: nt, nq, ttl or rj
        #[arg(long, default_value = "nt")]
        format: RdfFormat,
    },

    /// Upload to a remote graph store (Fuseki)
    Remote {
        #[arg(long)]
        host: String,

        #[arg(long, default_value_t = 3030)]
        port: u16,

        /// Dataset name on the store
        #[arg(long)]
        dataset: String,

        /// Named graph to replace; the default graph when omitted
        #[arg(long)]
        graph: Option<String>,

        /// Use HTTPS
        #[arg(long)]
        tls: bool,

        /// Request timeout in seconds
        #[arg(long, default_value_t = 30)]
        timeout_secs: u64,
    },
}

impl OutputTarget {
    pub fn descriptor(&self) -> OutputDescriptor {
        match self {
            OutputTarget::File { dir, name, format } => {
                OutputDescriptor::File(FileTarget::new(dir.clone(), name.clone(), *format))
            }
            OutputTarget::Remote {
                host,
                port,
                dataset,
                graph,
                tls,
                timeout_secs,
            } => OutputDescriptor::Remote(RemoteTarget {
                host: host.clone(),
                port: *port,
                dataset: dataset.clone(),
                graph: graph.clone(),
                tls: *tls,
                timeout: Duration::from_secs(*timeout_secs),
            }),
        }
    }
}
