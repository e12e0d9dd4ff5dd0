//! Catalogue GC.
//!
//! Every expansion tick, removes Job Records in a terminal status older
//! than a configurable retention (default 24 h) and trims the history
//! index to the same horizon.

use std::sync::Arc;
use tracing::info;

use super::error::Result;
use super::queue::HISTORY_INDEX_KEY;
use super::store::SchedulingStore;

pub struct CatalogueGc {
    store: Arc<dyn SchedulingStore>,
}

impl CatalogueGc {
    pub fn new(store: Arc<dyn SchedulingStore>) -> Self {
        Self { store }
    }

    /// Deletes every `executionJob:*` hash and history-index entry whose
    /// completion timestamp is older than `now - retention`.
    pub async fn sweep(&self, now: i64, retention_secs: i64) -> Result<usize> {
        let cutoff = now - retention_secs;
        let members = self
            .store
            .zrange_by_score_asc(HISTORY_INDEX_KEY, i64::MIN, cutoff, None)
            .await?;

        let mut swept = 0usize;
        for member in &members {
            self.store
                .del_key(&format!("executionJob:{member}"))
                .await?;
            self.store.zrem_member(HISTORY_INDEX_KEY, member).await?;
            swept += 1;
        }
        if swept > 0 {
            info!(swept, cutoff, "catalogue GC swept terminal job records");
        }
        Ok(swept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::scheduling::job::{JobRecord, JobStatus};
    use crate::kernel::scheduling::queue::ExecutionQueue;
    use crate::kernel::scheduling::store::InMemorySchedulingStore;

    #[tokio::test]
    async fn sweeps_only_entries_older_than_retention() {
        let store = Arc::new(InMemorySchedulingStore::new());
        let queue = ExecutionQueue::new(store.clone());
        let gc = CatalogueGc::new(store.clone());

        let job = JobRecord::new("internal", "checkIn", 100, 2, 60);
        queue.enqueue(&job).await.unwrap();
        queue
            .dequeue_terminal(job.execution_id, JobStatus::Success, None)
            .await
            .unwrap();

        // completion timestamp recorded via wall-clock now(); force an old
        // cutoff well in the future so retention has definitely elapsed.
        let swept = gc.sweep(i64::MAX / 2, 0).await.unwrap();
        assert_eq!(swept, 1);
        assert!(queue.job_record(job.execution_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn does_not_sweep_recent_entries() {
        let store = Arc::new(InMemorySchedulingStore::new());
        let queue = ExecutionQueue::new(store.clone());
        let gc = CatalogueGc::new(store.clone());

        let job = JobRecord::new("internal", "checkIn", 100, 2, 60);
        queue.enqueue(&job).await.unwrap();
        queue
            .dequeue_terminal(job.execution_id, JobStatus::Success, None)
            .await
            .unwrap();

        let swept = gc.sweep(0, 86_400).await.unwrap();
        assert_eq!(swept, 0);
        assert!(queue.job_record(job.execution_id).await.unwrap().is_some());
    }
}
