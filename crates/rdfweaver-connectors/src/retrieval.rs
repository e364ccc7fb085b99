//! Background retrieval of one source reference.

use std::sync::Arc;

use futures::TryStreamExt;
use rdfweaver_core::SourceRef;
use sqlx::{AnyPool, Executor};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::batch_store::SourceSlot;
use crate::config::Driver;
use crate::error::SourceError;
use crate::pool::catalog_statement;
use crate::row::convert_row;

/// Streams one statement's result set into fixed-size batches.
///
/// The task holds a single pooled connection for its whole run and publishes
/// each batch as soon as it is full, so consumers can start on batch 0 while
/// later rows are still being read.
pub(crate) struct RetrievalTask {
    pub pool: AnyPool,
    pub driver: Driver,
    pub database: Option<String>,
    pub source: SourceRef,
    pub sql: String,
    pub max_batch_rows: usize,
    pub slot: Arc<SourceSlot>,
}

impl RetrievalTask {
    /// Start the task. The returned handle resolves once the slot holds a
    /// terminal state, even if the task itself panicked.
    pub fn spawn(self) -> JoinHandle<()> {
        let slot = Arc::clone(&self.slot);
        let source = self.source.clone();
        supervise(slot, source, tokio::spawn(self.run()))
    }

    async fn run(self) {
        info!("Starting retrieval for {}", self.source);
        match self.stream_batches().await {
            Ok(produced) => {
                info!(
                    "Retrieval for {} finished with {} batches",
                    self.source, produced
                );
                self.slot.finish();
            }
            Err(e) => {
                error!("Retrieval for {} failed: {}", self.source, e);
                self.slot.fail(e);
            }
        }
    }

    async fn stream_batches(&self) -> Result<usize, SourceError> {
        let mut conn = self.pool.acquire().await.map_err(SourceError::connection)?;
        if let Some(sql) = catalog_statement(self.driver, self.database.as_deref()) {
            debug!("Selecting catalog: {}", sql);
            (&mut *conn)
                .execute(sqlx::raw_sql(&sql))
                .await
                .map_err(SourceError::catalog)?;
        }

        debug!("Retrieval query: {}", self.sql);
        let mut rows = sqlx::query(&self.sql).fetch(&mut *conn);
        let capacity = self.max_batch_rows.min(4096);
        let mut current = Vec::with_capacity(capacity);
        let mut produced = 0;

        while let Some(row) = rows.try_next().await.map_err(SourceError::data_access)? {
            current.push(convert_row(&row));
            if current.len() == self.max_batch_rows {
                let full = std::mem::replace(&mut current, Vec::with_capacity(capacity));
                let id = self.slot.publish(full);
                debug!("Published batch {} for {}", id, self.source);
                produced += 1;
            }
        }

        if !current.is_empty() {
            let id = self.slot.publish(current);
            debug!("Published final batch {} for {}", id, self.source);
            produced += 1;
        }
        Ok(produced)
    }
}

/// Fail `slot` if the task behind `handle` panics or is cancelled before it
/// records an outcome. A terminal state already set by the task is kept.
pub(crate) fn supervise(
    slot: Arc<SourceSlot>,
    source: SourceRef,
    handle: JoinHandle<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = handle.await {
            error!("Retrieval task for {} aborted: {}", source, e);
            slot.fail(SourceError::DataAccess(format!(
                "retrieval task aborted: {}",
                e
            )));
        }
    })
}
