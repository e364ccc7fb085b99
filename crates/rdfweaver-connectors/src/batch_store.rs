//! Shared store of published batches.
//!
//! Each source reference owns one [`SourceSlot`]. The retrieval task appends
//! batches to its slot and finally marks it finished or failed; consumers
//! wait on the slot for a particular batch index. Slots are claimed under a
//! lock so that exactly one caller ever starts the retrieval for a reference.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use rdfweaver_core::{Batch, Row, SourceRef};
use tokio::sync::{watch, Mutex};
use tokio::time::Instant;
use tracing::debug;

use crate::error::SourceError;

/// Lifecycle of one retrieval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetrievalStatus {
    Running,
    Finished,
    Failed(SourceError),
}

#[derive(Debug)]
struct Progress {
    batches: Vec<Arc<Batch>>,
    status: RetrievalStatus,
}

impl Progress {
    /// `None` while the answer for `batch_id` is still undecided.
    fn lookup(&self, batch_id: usize) -> Option<Result<Arc<Batch>, SourceError>> {
        if let Some(batch) = self.batches.get(batch_id) {
            return Some(Ok(Arc::clone(batch)));
        }
        match &self.status {
            RetrievalStatus::Running => None,
            RetrievalStatus::Finished => Some(Err(SourceError::BatchNotFound {
                batch_id,
                produced: self.batches.len(),
            })),
            RetrievalStatus::Failed(e) => Some(Err(e.clone())),
        }
    }
}

/// Published batches and status for one source reference.
///
/// Batches are write-once and appended in index order, so a visible batch
/// `k` implies batches `0..k` are visible too.
#[derive(Debug)]
pub struct SourceSlot {
    progress: watch::Sender<Progress>,
}

impl Default for SourceSlot {
    fn default() -> Self {
        let (progress, _) = watch::channel(Progress {
            batches: Vec::new(),
            status: RetrievalStatus::Running,
        });
        Self { progress }
    }
}

impl SourceSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Close `rows` into the next batch and publish it. Returns its index.
    pub fn publish(&self, rows: Vec<Row>) -> usize {
        let mut id = 0;
        self.progress.send_modify(|progress| {
            id = progress.batches.len();
            progress.batches.push(Arc::new(Batch::new(id, rows)));
        });
        id
    }

    /// Mark the retrieval complete. No effect once a terminal state is set.
    pub fn finish(&self) {
        self.set_terminal(RetrievalStatus::Finished);
    }

    /// Record a retrieval failure for every current and future waiter.
    pub fn fail(&self, error: SourceError) {
        self.set_terminal(RetrievalStatus::Failed(error));
    }

    fn set_terminal(&self, status: RetrievalStatus) {
        self.progress.send_if_modified(|progress| {
            if progress.status != RetrievalStatus::Running {
                return false;
            }
            progress.status = status;
            true
        });
    }

    pub fn status(&self) -> RetrievalStatus {
        self.progress.borrow().status.clone()
    }

    /// Number of batches published so far.
    pub fn produced(&self) -> usize {
        self.progress.borrow().batches.len()
    }

    /// Wait until batch `batch_id` is published, the retrieval ends without
    /// it, or `timeout` elapses.
    ///
    /// The waiter is woken on every publish; `poll_interval` only bounds how
    /// long it sleeps between progress reports.
    pub async fn wait_for(
        &self,
        batch_id: usize,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Result<Arc<Batch>, SourceError> {
        let started = Instant::now();
        let deadline = started + timeout;
        let mut rx = self.progress.subscribe();

        loop {
            let answer = rx.borrow_and_update().lookup(batch_id);
            if let Some(result) = answer {
                return result;
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(SourceError::RetrievalTimeout {
                    batch_id,
                    waited: now - started,
                });
            }

            let wake = std::cmp::min(deadline, now + poll_interval);
            match tokio::time::timeout_at(wake, rx.changed()).await {
                Ok(Ok(())) => {}
                Ok(Err(_)) => {
                    return Err(SourceError::DataAccess(
                        "retrieval state was dropped".into(),
                    ))
                }
                Err(_) => debug!(
                    "Still waiting for batch {} after {:?} ({} batches published)",
                    batch_id,
                    started.elapsed(),
                    self.produced()
                ),
            }
        }
    }
}

/// All slots, keyed by source reference.
#[derive(Debug, Default)]
pub struct BatchStore {
    slots: Mutex<HashMap<SourceRef, Arc<SourceSlot>>>,
}

impl BatchStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Slot for `source`, creating it if needed. The flag is `true` only for
    /// the caller that created it, which is then responsible for starting
    /// the retrieval.
    pub async fn claim(&self, source: &SourceRef) -> (Arc<SourceSlot>, bool) {
        let mut slots = self.slots.lock().await;
        if let Some(slot) = slots.get(source) {
            return (Arc::clone(slot), false);
        }
        let slot = Arc::new(SourceSlot::new());
        slots.insert(source.clone(), Arc::clone(&slot));
        (slot, true)
    }

    pub async fn slot(&self, source: &SourceRef) -> Option<Arc<SourceSlot>> {
        self.slots.lock().await.get(source).cloned()
    }

    /// Drop the batches held for `source`. Returns `false` if there were none.
    pub async fn release(&self, source: &SourceRef) -> bool {
        self.slots.lock().await.remove(source).is_some()
    }

    /// Number of source references with a slot.
    pub async fn len(&self) -> usize {
        self.slots.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.slots.lock().await.is_empty()
    }
}
