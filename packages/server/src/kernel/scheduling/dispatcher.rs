//! Dispatcher.
//!
//! Cooperative loop, tick ~1 s: reads due Jobs, resolves expiry versus
//! execution, flips `queued → running`, resolves the owning user, looks up
//! the helper implementation, and hands the Job to the [`Executor`] without
//! awaiting it. A transport error at the `due_now` step backs off 5 s and
//! retries; a transport error for an individual Job is logged and does not
//! abort the tick.

use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use super::executor::Executor;
use super::helper::HelperContext;
use super::job::JobStatus;
use super::queue::ExecutionQueue;
use super::registry::HelperRegistry;
use super::user_directory::{GetUserOptions, UserDirectory};

const TRANSPORT_BACKOFF: Duration = Duration::from_secs(5);

pub struct Dispatcher {
    queue: Arc<ExecutionQueue>,
    registry: Arc<HelperRegistry>,
    user_directory: Arc<dyn UserDirectory>,
    executor: Arc<Executor>,
}

impl Dispatcher {
    pub fn new(
        queue: Arc<ExecutionQueue>,
        registry: Arc<HelperRegistry>,
        user_directory: Arc<dyn UserDirectory>,
        executor: Arc<Executor>,
    ) -> Self {
        Self {
            queue,
            registry,
            user_directory,
            executor,
        }
    }

    /// Runs the dispatcher loop until `shutdown` is signalled. Sleeps
    /// `tick` between passes; on a transport error at the `due_now` step,
    /// sleeps [`TRANSPORT_BACKOFF`] instead and retries.
    pub async fn run(&self, tick: Duration, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("dispatcher loop stopping on shutdown signal");
                        return;
                    }
                }
                result = self.tick_once(now_sec()) => {
                    let sleep_for = match result {
                        Ok(()) => tick,
                        Err(err) => {
                            warn!(error = %err, "dispatcher tick failed at transport layer, backing off");
                            TRANSPORT_BACKOFF
                        }
                    };
                    tokio::time::sleep(sleep_for).await;
                }
            }
        }
    }

    /// One dispatcher pass at `now_sec`. Exposed separately from [`run`] for
    /// deterministic tests.
    pub async fn tick_once(&self, now_sec: i64) -> super::error::Result<()> {
        let due = self.queue.due_now(now_sec).await?;
        for job in due {
            if job.status != JobStatus::Queued {
                continue;
            }

            if now_sec > job.execution_time + job.execution_expiry {
                if let Err(err) = self
                    .queue
                    .dequeue_terminal(job.execution_id, JobStatus::Expired, None)
                    .await
                {
                    warn!(execution_id = %job.execution_id, error = %err, "failed to expire job");
                }
                continue;
            }

            match self.queue.mark_running(job.execution_id).await {
                Ok(true) => {}
                Ok(false) => continue, // a racing tick already claimed it
                Err(err) => {
                    warn!(execution_id = %job.execution_id, error = %err, "failed to mark job running");
                    continue;
                }
            }

            let user = if job.is_internal() {
                None
            } else {
                match self
                    .user_directory
                    .get_user_by_id(&job.user_id, GetUserOptions::default())
                    .await
                {
                    Ok(Some(user)) => Some(user),
                    Ok(None) => {
                        self.fail_job(job.execution_id, "user_missing").await;
                        continue;
                    }
                    Err(err) => {
                        error!(user_id = %job.user_id, error = %err, "user directory lookup failed");
                        self.fail_job(job.execution_id, "user_missing").await;
                        continue;
                    }
                }
            };

            let Some(helper) = self.registry.get(&job.helper_id) else {
                warn!(helper_id = %job.helper_id, "helper not found in registry at dispatch time");
                self.fail_job(job.execution_id, "helper_missing").await;
                continue;
            };

            let params = user
                .as_ref()
                .and_then(|u| u.services.iter().find(|s| s.helper_id == job.helper_id))
                .map(|s| s.params.clone())
                .unwrap_or_default();

            let ctx = HelperContext { user, params };
            let executor = self.executor.clone();
            tokio::spawn(async move {
                executor.execute(helper, job, ctx).await;
            });
        }
        Ok(())
    }

    async fn fail_job(&self, execution_id: uuid::Uuid, cause: &str) {
        if let Err(err) = self
            .queue
            .dequeue_terminal(execution_id, JobStatus::Error, Some(cause.to_string()))
            .await
        {
            error!(execution_id = %execution_id, error = %err, "failed to mark job error");
        }
    }
}

fn now_sec() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system clock is after the epoch")
        .as_secs() as i64
}
