//! rdfweaver CLI - map relational data to RDF

mod args;
mod pipeline;

use anyhow::{Context, Result};
use clap::Parser;
use rdfweaver_connectors::{RelationalSource, RetrievalConfig};
use rdfweaver_core::DirectMapper;
use rdfweaver_output::build_output;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::args::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut retrieval = RetrievalConfig::from_env()?;
    if let Some(rows) = cli.batch_rows {
        retrieval = retrieval.with_max_batch_rows(rows);
    }

    let reference = cli.source.source_ref();
    let mapper = DirectMapper::new(
        &cli.mapping.base_iri,
        cli.mapping.class.clone(),
        cli.mapping.key.clone(),
    )?;
    let Command::Output { target } = &cli.command;
    let output = build_output(target.descriptor())?;

    let server = cli.server.to_config();
    info!("Connecting to {:?}", server);
    let source = RelationalSource::connect(&server, retrieval)
        .await
        .context("Failed to connect to source database")?;

    let result = pipeline::weave(&source, &reference, &mapper, output.as_ref()).await;
    source.release(&reference).await;
    source.close().await;

    let summary = result?;
    info!(
        "Saved {} triples from {} rows ({} batches) to {}",
        summary.triples,
        summary.rows,
        summary.batches,
        output.destination()
    );
    Ok(())
}
