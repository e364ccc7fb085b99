//! Source → mapper → output.

use anyhow::{Context, Result};
use rdfweaver_core::{EntityMapper, Graph, InputSource, SourceRef};
use rdfweaver_output::RdfOutput;
use tracing::{debug, info};

/// What one weave produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WeaveSummary {
    pub batches: usize,
    pub rows: usize,
    pub triples: usize,
}

/// Map every batch of `reference` into one graph and hand it to `output`.
///
/// Batches are requested in order `0..n`; the first failure aborts the weave
/// before anything is saved.
pub async fn weave<S>(
    source: &S,
    reference: &SourceRef,
    mapper: &dyn EntityMapper,
    output: &dyn RdfOutput,
) -> Result<WeaveSummary>
where
    S: InputSource + ?Sized,
{
    let batches = source
        .calculate_num_of_batches(reference)
        .await
        .with_context(|| format!("Failed to count rows of {}", reference))?;
    info!("Weaving {} in {} batches", reference, batches);

    let mut graph = Graph::new();
    let mut rows = 0;
    for batch_id in 0..batches {
        let batch = source
            .get_entity_record(reference, batch_id)
            .await
            .with_context(|| format!("Failed to retrieve batch {} of {}", batch_id, reference))?;
        let added = mapper
            .map_batch(reference, &batch, &mut graph)
            .with_context(|| format!("Failed to map batch {} of {}", batch_id, reference))?;
        rows += batch.len();
        debug!("Batch {}/{}: {} rows, {} triples", batch_id + 1, batches, batch.len(), added);
    }

    output
        .save(&graph)
        .await
        .with_context(|| format!("Failed to save graph to {}", output.destination()))?;

    Ok(WeaveSummary {
        batches,
        rows,
        triples: graph.len(),
    })
}
