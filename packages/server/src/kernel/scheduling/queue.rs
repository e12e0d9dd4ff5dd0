//! Execution Queue (EQ).
//!
//! Temporal priority queue of pending Jobs: a hash per Job Record keyed by
//! `executionJob:<executionId>`, indexed by a sorted set `internalExecutionQueue`
//! scored by `executionScore`. Membership in the sorted set is exactly the
//! set of Jobs with status `queued` or `running`.

use std::sync::Arc;
use uuid::Uuid;

use super::error::Result;
use super::job::{JobRecord, JobStatus};
use super::store::SchedulingStore;

pub const QUEUE_INDEX_KEY: &str = "internalExecutionQueue";
pub const HISTORY_INDEX_KEY: &str = "internalExecutionHistory";
const JOB_KEY_PREFIX: &str = "executionJob:";

fn job_key(execution_id: Uuid) -> String {
    format!("{JOB_KEY_PREFIX}{execution_id}")
}

pub struct ExecutionQueue {
    store: Arc<dyn SchedulingStore>,
}

impl ExecutionQueue {
    pub fn new(store: Arc<dyn SchedulingStore>) -> Self {
        Self { store }
    }

    /// Writes the Job Record hash, then adds it to the sorted set index.
    pub async fn enqueue(&self, job: &JobRecord) -> Result<()> {
        self.store
            .hash_set(&job_key(job.execution_id), job.to_hash_fields())
            .await?;
        self.store
            .zadd_if_absent(QUEUE_INDEX_KEY, job.execution_score, &job.execution_id.to_string())
            .await?;
        Ok(())
    }

    /// Sets the terminal status and removes the Job from the sorted-set
    /// index. Never deletes the Job Record hash; that is the GC's job.
    pub async fn dequeue_terminal(
        &self,
        execution_id: Uuid,
        terminal_status: JobStatus,
        error: Option<String>,
    ) -> Result<()> {
        debug_assert!(terminal_status.is_terminal());
        self.store
            .hash_set_field(&job_key(execution_id), "status", status_str(terminal_status))
            .await?;
        if let Some(error) = error {
            self.store
                .hash_set_field(&job_key(execution_id), "error", &error)
                .await?;
        }
        self.store
            .zrem_member(QUEUE_INDEX_KEY, &execution_id.to_string())
            .await?;
        self.store
            .zadd_if_absent(HISTORY_INDEX_KEY, now_unix(), &execution_id.to_string())
            .await?;
        Ok(())
    }

    /// Jobs at or below score `nowSec*10 + 5`, filtered down to those still
    /// `queued` (the `+5` inclusive upper captures priority slots 1..5 at
    /// that second).
    pub async fn due_now(&self, now_sec: i64) -> Result<Vec<JobRecord>> {
        let max_score = now_sec * 10 + 5;
        let members = self
            .store
            .zrange_by_score_asc(QUEUE_INDEX_KEY, i64::MIN, max_score, None)
            .await?;
        let mut due = Vec::with_capacity(members.len());
        for member in members {
            let Ok(execution_id) = member.parse::<Uuid>() else {
                continue;
            };
            if let Some(job) = self.job_record(execution_id).await? {
                if job.status == JobStatus::Queued {
                    due.push(job);
                }
            }
        }
        Ok(due)
    }

    pub async fn job_record(&self, execution_id: Uuid) -> Result<Option<JobRecord>> {
        let Some(fields) = self.store.hash_get_all(&job_key(execution_id)).await? else {
            return Ok(None);
        };
        Ok(JobRecord::from_hash_fields(&fields))
    }

    /// Flips a still-`queued` Job to `running`. Returns `false` if the Job
    /// was not `queued` (e.g. a racing dispatcher tick already claimed it).
    pub async fn mark_running(&self, execution_id: Uuid) -> Result<bool> {
        let Some(job) = self.job_record(execution_id).await? else {
            return Ok(false);
        };
        if job.status != JobStatus::Queued {
            return Ok(false);
        }
        self.store
            .hash_set_field(&job_key(execution_id), "status", status_str(JobStatus::Running))
            .await?;
        Ok(true)
    }

    /// Cancels a Job iff it is still `queued`; used by `replanUser` (spec
    /// §4.4, §5: a `running` Job is never cancelled out from under the
    /// Executor).
    pub async fn cancel_if_queued(&self, execution_id: Uuid) -> Result<bool> {
        let Some(job) = self.job_record(execution_id).await? else {
            return Ok(false);
        };
        if job.status != JobStatus::Queued {
            return Ok(false);
        }
        self.dequeue_terminal(execution_id, JobStatus::Cancelled, None)
            .await?;
        Ok(true)
    }

    /// Every member currently indexed, regardless of score — used by the
    /// planner to find Jobs already queued for a given owner.
    pub async fn queued_and_running(&self) -> Result<Vec<JobRecord>> {
        let members = self.store.zrange_all(QUEUE_INDEX_KEY).await?;
        let mut jobs = Vec::with_capacity(members.len());
        for member in members {
            let Ok(execution_id) = member.parse::<Uuid>() else {
                continue;
            };
            if let Some(job) = self.job_record(execution_id).await? {
                jobs.push(job);
            }
        }
        Ok(jobs)
    }
}

fn status_str(status: JobStatus) -> &'static str {
    match status {
        JobStatus::Queued => "queued",
        JobStatus::Running => "running",
        JobStatus::Success => "success",
        JobStatus::Error => "error",
        JobStatus::Expired => "expired",
        JobStatus::Cancelled => "cancelled",
    }
}

fn now_unix() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system clock is after the epoch")
        .as_secs() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::scheduling::store::InMemorySchedulingStore;

    fn store() -> Arc<dyn SchedulingStore> {
        Arc::new(InMemorySchedulingStore::new())
    }

    #[tokio::test]
    async fn enqueue_then_dequeue_terminal_clears_index() {
        let eq = ExecutionQueue::new(store());
        let job = JobRecord::new("internal", "checkIn", 1_000_000, 2, 120);
        eq.enqueue(&job).await.unwrap();
        assert_eq!(eq.due_now(1_000_000).await.unwrap().len(), 1);

        eq.dequeue_terminal(job.execution_id, JobStatus::Success, None)
            .await
            .unwrap();
        assert!(eq.due_now(1_000_000).await.unwrap().is_empty());
        let record = eq.job_record(job.execution_id).await.unwrap().unwrap();
        assert_eq!(record.status, JobStatus::Success);
    }

    #[tokio::test]
    async fn due_now_excludes_future_jobs() {
        let eq = ExecutionQueue::new(store());
        let job = JobRecord::new("internal", "checkIn", 1_000_100, 2, 120);
        eq.enqueue(&job).await.unwrap();
        assert!(eq.due_now(1_000_000).await.unwrap().is_empty());
        assert_eq!(eq.due_now(1_000_100).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn mark_running_rejects_non_queued() {
        let eq = ExecutionQueue::new(store());
        let job = JobRecord::new("internal", "checkIn", 100, 2, 60);
        eq.enqueue(&job).await.unwrap();
        assert!(eq.mark_running(job.execution_id).await.unwrap());
        assert!(!eq.mark_running(job.execution_id).await.unwrap());
    }

    #[tokio::test]
    async fn cancel_if_queued_ignores_running_jobs() {
        let eq = ExecutionQueue::new(store());
        let job = JobRecord::new("u1", "daily", 100, 3, 600);
        eq.enqueue(&job).await.unwrap();
        eq.mark_running(job.execution_id).await.unwrap();
        assert!(!eq.cancel_if_queued(job.execution_id).await.unwrap());
        let record = eq.job_record(job.execution_id).await.unwrap().unwrap();
        assert_eq!(record.status, JobStatus::Running);
    }

    #[tokio::test]
    async fn enqueue_is_idempotent_on_duplicate_execution_id() {
        let eq = ExecutionQueue::new(store());
        let job = JobRecord::new("internal", "checkIn", 1_000_000, 2, 120);
        eq.enqueue(&job).await.unwrap();
        eq.enqueue(&job).await.unwrap();
        assert_eq!(eq.queued_and_running().await.unwrap().len(), 1);
    }
}
