//! Executor.
//!
//! Concurrency envelope around a helper's `run` operation: bounded
//! concurrency via a semaphore, cancellation on timeout, exactly-once
//! terminal status write-back. Runs cooperatively with the dispatcher —
//! the dispatcher spawns one task per due Job and does not await it.
//!
//! Deadline semantics are run-relative: the deadline timer starts the
//! moment the Executor receives the Job, not at the Job's originally
//! scheduled `executionTime`.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use super::helper::{Helper, HelperContext};
use super::job::{JobRecord, JobStatus};
use super::queue::ExecutionQueue;

pub struct Executor {
    queue: Arc<ExecutionQueue>,
    concurrency: Arc<Semaphore>,
}

impl Executor {
    pub fn new(queue: Arc<ExecutionQueue>, max_concurrency: usize) -> Self {
        Self {
            queue,
            concurrency: Arc::new(Semaphore::new(max_concurrency.max(1))),
        }
    }

    /// Runs `helper` bound to `job` and `ctx`, blocking on a concurrency
    /// permit first. Writes the terminal status exactly once on return.
    /// Intended to be spawned as an independent task by the dispatcher.
    pub async fn execute(&self, helper: Arc<dyn Helper>, job: JobRecord, ctx: HelperContext) {
        let permit = match self.concurrency.acquire().await {
            Ok(permit) => permit,
            Err(_) => return, // semaphore closed at shutdown
        };

        let deadline = Duration::from_secs(job.execution_expiry.max(0) as u64);
        let started = Instant::now();
        let run = helper.run(ctx);

        let (status, error_message) = match tokio::time::timeout(deadline, run).await {
            Ok(Ok(())) => {
                info!(
                    execution_id = %job.execution_id,
                    helper_id = %job.helper_id,
                    user_id = %job.user_id,
                    elapsed_ms = started.elapsed().as_millis(),
                    "helper run succeeded"
                );
                (JobStatus::Success, None)
            }
            Ok(Err(err)) => {
                error!(
                    execution_id = %job.execution_id,
                    helper_id = %job.helper_id,
                    user_id = %job.user_id,
                    error = %err,
                    "helper run failed"
                );
                (JobStatus::Error, Some(err.to_string()))
            }
            Err(_) => {
                warn!(
                    execution_id = %job.execution_id,
                    helper_id = %job.helper_id,
                    user_id = %job.user_id,
                    deadline_secs = deadline.as_secs(),
                    "helper run exceeded its execution deadline"
                );
                (JobStatus::Error, Some("timeout".to_string()))
            }
        };

        drop(permit);

        if let Err(err) = self
            .queue
            .dequeue_terminal(job.execution_id, status, error_message)
            .await
        {
            error!(execution_id = %job.execution_id, error = %err, "failed to write back terminal status");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::scheduling::store::InMemorySchedulingStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::collections::HashMap;

    struct Immediate;

    #[async_trait]
    impl Helper for Immediate {
        fn id(&self) -> &str {
            "immediate"
        }
        async fn run(&self, _ctx: HelperContext) -> anyhow::Result<()> {
            Ok(())
        }
    }

    struct AlwaysFails;

    #[async_trait]
    impl Helper for AlwaysFails {
        fn id(&self) -> &str {
            "fails"
        }
        async fn run(&self, _ctx: HelperContext) -> anyhow::Result<()> {
            anyhow::bail!("boom")
        }
    }

    struct Sleeps(Duration);

    #[async_trait]
    impl Helper for Sleeps {
        fn id(&self) -> &str {
            "sleeps"
        }
        async fn run(&self, _ctx: HelperContext) -> anyhow::Result<()> {
            tokio::time::sleep(self.0).await;
            Ok(())
        }
    }

    fn ctx() -> HelperContext {
        HelperContext {
            user: None,
            params: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn successful_run_marks_success() {
        let store = Arc::new(InMemorySchedulingStore::new());
        let queue = Arc::new(ExecutionQueue::new(store));
        let executor = Executor::new(queue.clone(), 4);
        let job = JobRecord::new("internal", "immediate", 100, 2, 60);
        queue.enqueue(&job).await.unwrap();

        executor.execute(Arc::new(Immediate), job.clone(), ctx()).await;

        let record = queue.job_record(job.execution_id).await.unwrap().unwrap();
        assert_eq!(record.status, JobStatus::Success);
    }

    #[tokio::test]
    async fn failing_run_marks_error_with_message() {
        let store = Arc::new(InMemorySchedulingStore::new());
        let queue = Arc::new(ExecutionQueue::new(store));
        let executor = Executor::new(queue.clone(), 4);
        let job = JobRecord::new("internal", "fails", 100, 2, 60);
        queue.enqueue(&job).await.unwrap();

        executor.execute(Arc::new(AlwaysFails), job.clone(), ctx()).await;

        let record = queue.job_record(job.execution_id).await.unwrap().unwrap();
        assert_eq!(record.status, JobStatus::Error);
        assert_eq!(record.error.as_deref(), Some("boom"));
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_marks_error_with_timeout_cause() {
        let store = Arc::new(InMemorySchedulingStore::new());
        let queue = Arc::new(ExecutionQueue::new(store));
        let executor = Executor::new(queue.clone(), 4);
        let job = JobRecord::new("internal", "sleeps", 100, 2, 1);
        queue.enqueue(&job).await.unwrap();

        let handle = tokio::spawn({
            let executor_queue = queue.clone();
            let job = job.clone();
            async move {
                let executor = Executor::new(executor_queue, 4);
                executor
                    .execute(Arc::new(Sleeps(Duration::from_secs(5))), job, ctx())
                    .await;
            }
        });
        tokio::time::advance(Duration::from_secs(2)).await;
        handle.await.unwrap();

        let record = queue.job_record(job.execution_id).await.unwrap().unwrap();
        assert_eq!(record.status, JobStatus::Error);
        assert_eq!(record.error.as_deref(), Some("timeout"));
    }

    #[tokio::test]
    async fn concurrency_is_bounded() {
        let store = Arc::new(InMemorySchedulingStore::new());
        let queue = Arc::new(ExecutionQueue::new(store));
        let executor = Arc::new(Executor::new(queue.clone(), 2));
        let in_flight = Arc::new(AtomicUsize::new(0));
        let max_observed = Arc::new(AtomicUsize::new(0));

        struct Tracked {
            in_flight: Arc<AtomicUsize>,
            max_observed: Arc<AtomicUsize>,
        }

        #[async_trait]
        impl Helper for Tracked {
            fn id(&self) -> &str {
                "tracked"
            }
            async fn run(&self, _ctx: HelperContext) -> anyhow::Result<()> {
                let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                self.max_observed.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(50)).await;
                self.in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok(())
            }
        }

        let mut handles = Vec::new();
        for i in 0..5 {
            let job = JobRecord::new("internal", "tracked", 100 + i, 2, 60);
            queue.enqueue(&job).await.unwrap();
            let helper: Arc<dyn Helper> = Arc::new(Tracked {
                in_flight: in_flight.clone(),
                max_observed: max_observed.clone(),
            });
            let executor = executor.clone();
            handles.push(tokio::spawn(
                async move { executor.execute(helper, job, ctx()).await },
            ));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert!(max_observed.load(Ordering::SeqCst) <= 2);
    }
}
