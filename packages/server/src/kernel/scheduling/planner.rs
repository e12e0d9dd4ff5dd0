//! Queue Planner.
//!
//! Produces Jobs by expanding each enabled (catalogue × user-subscription)
//! pair against a time window: `build_initial` at boot, `expand_window` on
//! a sliding cadence, `replan_user` on subscription change.

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::warn;

use super::catalogue::{Catalogue, HelperDefinition};
use super::cron;
use super::error::Result;
use super::job::{JobRecord, JobStatus, INTERNAL_OWNER};
use super::queue::ExecutionQueue;
use super::user_directory::{Subscription, UserDirectory, UserRecord};

pub struct QueuePlanner {
    catalogue: Arc<Catalogue>,
    queue: Arc<ExecutionQueue>,
    user_directory: Arc<dyn UserDirectory>,
    planning_window: chrono::Duration,
}

impl QueuePlanner {
    pub fn new(
        catalogue: Arc<Catalogue>,
        queue: Arc<ExecutionQueue>,
        user_directory: Arc<dyn UserDirectory>,
        planning_window: std::time::Duration,
    ) -> Self {
        Self {
            catalogue,
            queue,
            user_directory,
            planning_window: chrono::Duration::from_std(planning_window)
                .unwrap_or_else(|_| chrono::Duration::seconds(7200)),
        }
    }

    /// Plans across `[now, now + planning_window]` for every internal
    /// helper and every active user's enabled subscriptions. `boot_run`
    /// helpers additionally get one Job enqueued exactly at `now`.
    pub async fn build_initial(&self, now: DateTime<Utc>) -> Result<()> {
        let helpers = self.catalogue.all().await?;
        let window_end = now + self.planning_window;

        for helper in helpers.iter().filter(|h| h.internal && !h.disabled) {
            self.plan_one(helper, INTERNAL_OWNER, &helper.schedule, now, window_end, true, &[])
                .await?;
        }

        for user in self.user_directory.get_all_active_users().await? {
            self.plan_user_subscriptions(&user, &helpers, now, window_end, true, &[])
                .await?;
        }
        Ok(())
    }

    /// Re-computes the window `[now, now + 10 min]` (the expansion cadence
    /// window, independent of `planning_window`) for every active
    /// subscription and internal helper, skipping any `(helperId, userId,
    /// executionTime)` triple already represented by a queued/running Job.
    pub async fn expand_window(
        &self,
        now: DateTime<Utc>,
        expansion_interval: std::time::Duration,
    ) -> Result<()> {
        let helpers = self.catalogue.all().await?;
        let window_end =
            now + chrono::Duration::from_std(expansion_interval).unwrap_or(chrono::Duration::seconds(600));
        let already_queued = self.queue.queued_and_running().await?;

        for helper in helpers.iter().filter(|h| h.internal && !h.disabled) {
            self.plan_one(
                helper,
                INTERNAL_OWNER,
                &helper.schedule,
                now,
                window_end,
                false,
                &already_queued,
            )
            .await?;
        }

        for user in self.user_directory.get_all_active_users().await? {
            self.plan_user_subscriptions(&user, &helpers, now, window_end, false, &already_queued)
                .await?;
        }
        Ok(())
    }

    /// Cancels every `queued` Job owned by `user_id`, then plans that user
    /// over `[now, now + planning_window]`. Never re-triggers a
    /// `boot_run` short-circuit.
    pub async fn replan_user(&self, user_id: &str, now: DateTime<Utc>) -> Result<()> {
        for job in self.queue.queued_and_running().await? {
            if job.user_id == user_id && job.status == JobStatus::Queued {
                self.queue.cancel_if_queued(job.execution_id).await?;
            }
        }

        let lookup = self
            .user_directory
            .get_user_by_id(user_id, Default::default())
            .await
            .map_err(|err| super::error::SchedulingError::StoreTransportError(err.to_string()))?;
        let Some(user) = lookup else {
            return Ok(());
        };
        if !user.is_active() {
            return Ok(());
        }

        let helpers = self.catalogue.all().await?;
        let window_end = now + self.planning_window;
        self.plan_user_subscriptions(&user, &helpers, now, window_end, false, &[])
            .await
    }

    async fn plan_user_subscriptions(
        &self,
        user: &UserRecord,
        helpers: &[HelperDefinition],
        now: DateTime<Utc>,
        window_end: DateTime<Utc>,
        include_boot_run: bool,
        already_queued: &[JobRecord],
    ) -> Result<()> {
        for subscription in &user.services {
            if !subscription.enabled {
                continue;
            }
            let Some(helper) = helpers.iter().find(|h| h.id == subscription.helper_id) else {
                continue;
            };
            if helper.internal || helper.disabled {
                continue;
            }
            if !helper.region_allowed(&user.region) {
                continue;
            }
            if helper.admin_only && !user.admin {
                continue;
            }
            // `require_admin_activation` is enforced at subscription time by
            // the Mutation API; a subscription already present in
            // `user.services` has already cleared that gate.

            let schedule = self.effective_schedule(helper, subscription);
            self.plan_one(
                helper,
                &user.id,
                schedule,
                now,
                window_end,
                include_boot_run,
                already_queued,
            )
            .await?;
        }
        Ok(())
    }

    fn effective_schedule<'a>(
        &self,
        helper: &'a HelperDefinition,
        subscription: &'a Subscription,
    ) -> &'a [String] {
        if helper.allow_execution_time_config {
            &subscription.schedule
        } else {
            &helper.schedule
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn plan_one(
        &self,
        helper: &HelperDefinition,
        owner: &str,
        schedule: &[String],
        now: DateTime<Utc>,
        window_end: DateTime<Utc>,
        include_boot_run: bool,
        already_queued: &[JobRecord],
    ) -> Result<()> {
        if include_boot_run && helper.boot_run {
            let job = JobRecord::new(owner, &helper.id, now.timestamp(), helper.priority, helper.timeout);
            self.queue.enqueue(&job).await?;
        }

        let existing: HashSet<(String, String, i64)> = already_queued
            .iter()
            .map(|j| (j.user_id.clone(), j.helper_id.clone(), j.execution_time))
            .collect();

        let dedupe = !already_queued.is_empty();

        for expression in schedule {
            let fires = match cron::expand(expression, now, window_end) {
                Ok(fires) => fires,
                Err(err) => {
                    warn!(helper_id = %helper.id, owner, expression, error = %err, "skipping invalid cron expression");
                    continue;
                }
            };
            for fire in fires {
                if dedupe && existing.contains(&(owner.to_string(), helper.id.clone(), fire)) {
                    continue;
                }
                let job = JobRecord::new(owner, &helper.id, fire, helper.priority, helper.timeout);
                self.queue.enqueue(&job).await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::scheduling::catalogue::ParamType;
    use crate::kernel::scheduling::store::InMemorySchedulingStore;
    use crate::kernel::scheduling::user_directory::{GetUserOptions, InMemoryUserDirectory, UserStatus};
    use chrono::TimeZone;
    use std::collections::HashMap;

    fn internal_helper(boot_run: bool) -> HelperDefinition {
        HelperDefinition {
            id: "checkIn".to_string(),
            name: "Check In".to_string(),
            description: "".to_string(),
            params: HashMap::new(),
            internal: true,
            admin_only: false,
            require_admin_activation: false,
            boot_run,
            priority: 2,
            timeout: 120,
            allow_execution_time_config: false,
            schedule: vec!["*/2 * * * *".to_string()],
            disabled: false,
            region_lock: vec!["*".to_string()],
        }
    }

    fn user_helper() -> HelperDefinition {
        HelperDefinition {
            id: "daily".to_string(),
            name: "Daily".to_string(),
            description: "".to_string(),
            params: HashMap::new(),
            internal: false,
            admin_only: false,
            require_admin_activation: false,
            boot_run: false,
            priority: 3,
            timeout: 600,
            allow_execution_time_config: true,
            schedule: vec![],
            disabled: false,
            region_lock: vec!["*".to_string()],
        }
    }

    async fn setup() -> (QueuePlanner, Arc<ExecutionQueue>, Arc<InMemoryUserDirectory>) {
        let store = Arc::new(InMemorySchedulingStore::new());
        let catalogue = Arc::new(Catalogue::new(store.clone()));
        let queue = Arc::new(ExecutionQueue::new(store.clone()));
        let directory = Arc::new(InMemoryUserDirectory::new());
        let planner = QueuePlanner::new(
            catalogue.clone(),
            queue.clone(),
            directory.clone(),
            std::time::Duration::from_secs(7200),
        );
        (planner, queue, directory)
    }

    #[tokio::test]
    async fn boot_run_helper_enqueues_once_plus_every_cron_firing() {
        let (planner, queue, _directory) = setup().await;
        planner.catalogue.register(&internal_helper(true)).await.unwrap();

        let now = Utc.timestamp_opt(1_000_000, 0).unwrap();
        planner.build_initial(now).await.unwrap();

        let jobs = queue.queued_and_running().await.unwrap();
        let boot_job = jobs.iter().find(|j| j.execution_time == 1_000_000).unwrap();
        assert_eq!(boot_job.execution_score, 10_000_004);
        // plus every */2 firing up to now + 7200
        assert!(jobs.len() > 1);
    }

    #[tokio::test]
    async fn expand_window_does_not_re_fire_boot_run_short_circuit() {
        let (planner, queue, _directory) = setup().await;
        planner.catalogue.register(&internal_helper(true)).await.unwrap();

        let t0 = Utc.timestamp_opt(1_000_000, 0).unwrap();
        planner.build_initial(t0).await.unwrap();
        let boot_jobs_after_initial = queue
            .queued_and_running()
            .await
            .unwrap()
            .iter()
            .filter(|j| j.execution_time == t0.timestamp())
            .count();
        assert_eq!(boot_jobs_after_initial, 1);

        // Ten expansion ticks later, the at-`now` boot_run short-circuit
        // must not have fired again (only build_initial enqueues it).
        for i in 1..=10i64 {
            let tick_now = t0 + chrono::Duration::minutes(10 * i);
            planner
                .expand_window(tick_now, std::time::Duration::from_secs(600))
                .await
                .unwrap();
            let boot_jobs_at_tick_now = queue
                .queued_and_running()
                .await
                .unwrap()
                .iter()
                .filter(|j| j.execution_time == tick_now.timestamp())
                .count();
            assert_eq!(boot_jobs_at_tick_now, 0);
        }
    }

    #[tokio::test]
    async fn user_cron_subscription_produces_one_job_with_expected_score() {
        let (planner, queue, directory) = setup().await;
        let mut helper = user_helper();
        helper.region_lock = vec!["*".to_string()];
        planner.catalogue.register(&helper).await.unwrap();

        directory.insert(UserRecord {
            id: "u1".to_string(),
            admin: false,
            status: UserStatus::Active,
            region: "PT".to_string(),
            services: vec![Subscription {
                helper_id: "daily".to_string(),
                enabled: true,
                params: HashMap::new(),
                schedule: vec!["0 8 * * *".to_string()],
            }],
        });

        let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        planner.build_initial(now).await.unwrap();

        let jobs = queue.queued_and_running().await.unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].user_id, "u1");
        assert_eq!(jobs[0].execution_score, 17_172_288_003);
    }

    #[tokio::test]
    async fn replan_cancels_pending_job_then_is_idempotent() {
        let (planner, queue, directory) = setup().await;
        planner.catalogue.register(&user_helper()).await.unwrap();
        directory.insert(UserRecord {
            id: "u1".to_string(),
            admin: false,
            status: UserStatus::Active,
            region: "PT".to_string(),
            services: vec![Subscription {
                helper_id: "daily".to_string(),
                enabled: true,
                params: HashMap::new(),
                schedule: vec!["0 8 * * *".to_string()],
            }],
        });

        let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        planner.build_initial(now).await.unwrap();
        assert_eq!(queue.queued_and_running().await.unwrap().len(), 1);

        // user unsubscribes
        let mut user = directory
            .get_user_by_id("u1", GetUserOptions::default())
            .await
            .unwrap()
            .unwrap();
        user.services.clear();
        directory.update_user("u1", user).await.unwrap();

        planner.replan_user("u1", now).await.unwrap();
        assert!(queue.queued_and_running().await.unwrap().is_empty());

        // second replan is a no-op
        planner.replan_user("u1", now).await.unwrap();
        assert!(queue.queued_and_running().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn expansion_does_not_duplicate_already_queued_triple() {
        let (planner, queue, directory) = setup().await;
        let mut helper = user_helper();
        helper.allow_execution_time_config = true;
        planner.catalogue.register(&helper).await.unwrap();
        directory.insert(UserRecord {
            id: "u1".to_string(),
            admin: false,
            status: UserStatus::Active,
            region: "PT".to_string(),
            services: vec![Subscription {
                helper_id: "daily".to_string(),
                enabled: true,
                params: HashMap::new(),
                schedule: vec!["*/30 * * * *".to_string()],
            }],
        });

        let t0 = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        planner.build_initial(t0).await.unwrap();
        let count_after_initial = queue.queued_and_running().await.unwrap().len();

        let t1 = t0 + chrono::Duration::minutes(10);
        planner
            .expand_window(t1, std::time::Duration::from_secs(600))
            .await
            .unwrap();
        let count_after_expand = queue.queued_and_running().await.unwrap().len();
        assert_eq!(count_after_initial, count_after_expand);
    }

    #[tokio::test]
    async fn region_lock_blocks_planning_for_mismatched_user() {
        let (planner, queue, directory) = setup().await;
        let mut helper = user_helper();
        helper.region_lock = vec!["US".to_string()];
        planner.catalogue.register(&helper).await.unwrap();
        directory.insert(UserRecord {
            id: "u2".to_string(),
            admin: false,
            status: UserStatus::Active,
            region: "PT".to_string(),
            services: vec![Subscription {
                helper_id: "daily".to_string(),
                enabled: true,
                params: HashMap::new(),
                schedule: vec!["0 8 * * *".to_string()],
            }],
        });

        let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        planner.build_initial(now).await.unwrap();
        assert!(queue.queued_and_running().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn invalid_cron_in_one_expression_does_not_block_others() {
        let (planner, queue, directory) = setup().await;
        let mut helper = user_helper();
        helper.allow_execution_time_config = true;
        planner.catalogue.register(&helper).await.unwrap();
        directory.insert(UserRecord {
            id: "u1".to_string(),
            admin: false,
            status: UserStatus::Active,
            region: "PT".to_string(),
            services: vec![Subscription {
                helper_id: "daily".to_string(),
                enabled: true,
                params: HashMap::new(),
                schedule: vec!["not a cron".to_string(), "0 8 * * *".to_string()],
            }],
        });

        let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        planner.build_initial(now).await.unwrap();
        assert_eq!(queue.queued_and_running().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn params_require_type_unused_but_admin_gate_enforced() {
        let (planner, queue, directory) = setup().await;
        let mut helper = user_helper();
        helper.admin_only = true;
        helper
            .params
            .insert("limit".to_string(), ParamType::Integer);
        planner.catalogue.register(&helper).await.unwrap();
        directory.insert(UserRecord {
            id: "u1".to_string(),
            admin: false,
            status: UserStatus::Active,
            region: "PT".to_string(),
            services: vec![Subscription {
                helper_id: "daily".to_string(),
                enabled: true,
                params: HashMap::new(),
                schedule: vec!["0 8 * * *".to_string()],
            }],
        });

        let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        planner.build_initial(now).await.unwrap();
        assert!(queue.queued_and_running().await.unwrap().is_empty());
    }
}
