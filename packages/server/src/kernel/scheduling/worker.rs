//! Scheduling process supervisor.
//!
//! One logical process hosting the dispatcher loop, the expansion loop
//! (queue planner `expand_window` + catalogue GC, sharing a cadence), and
//! the replan-channel consumer. On shutdown, the dispatcher stops accepting
//! new work and outstanding Executor tasks get up to `shutdown_grace` to
//! finish before the process exits; there is no checkpoint of partial
//! progress.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

use super::dispatcher::Dispatcher;
use super::events::ReplanReceiver;
use super::gc::CatalogueGc;
use super::planner::QueuePlanner;

pub struct SchedulingProcessConfig {
    pub dispatch_tick: Duration,
    pub expansion_interval: Duration,
    pub execution_history_retention: Duration,
    pub shutdown_grace: Duration,
}

/// Owns the three cooperative loops and drives them to completion on
/// shutdown.
pub struct SchedulingProcess {
    dispatcher: Arc<Dispatcher>,
    planner: Arc<QueuePlanner>,
    gc: Arc<CatalogueGc>,
    config: SchedulingProcessConfig,
}

impl SchedulingProcess {
    pub fn new(
        dispatcher: Arc<Dispatcher>,
        planner: Arc<QueuePlanner>,
        gc: Arc<CatalogueGc>,
        config: SchedulingProcessConfig,
    ) -> Self {
        Self {
            dispatcher,
            planner,
            gc,
            config,
        }
    }

    /// Runs the initial plan, then spawns the dispatcher loop, the
    /// expansion+GC loop, and the replan-channel consumer. Returns when
    /// `shutdown` fires true, after giving in-flight work
    /// `config.shutdown_grace` to finish.
    pub async fn run(&self, replan_rx: ReplanReceiver, mut shutdown: watch::Receiver<bool>) {
        if let Err(err) = self.planner.build_initial(chrono::Utc::now()).await {
            warn!(error = %err, "initial queue plan failed");
        }

        let dispatch_shutdown = shutdown.clone();
        let dispatcher = self.dispatcher.clone();
        let tick = self.config.dispatch_tick;
        let dispatch_task = tokio::spawn(async move {
            dispatcher.run(tick, dispatch_shutdown).await;
        });

        let expansion_task = tokio::spawn(Self::expansion_loop(
            self.planner.clone(),
            self.gc.clone(),
            self.config.expansion_interval,
            self.config.execution_history_retention,
            shutdown.clone(),
        ));

        let replan_task = tokio::spawn(Self::replan_loop(
            self.planner.clone(),
            replan_rx,
            shutdown.clone(),
        ));

        let _ = shutdown.changed().await;
        info!(
            grace_secs = self.config.shutdown_grace.as_secs(),
            "scheduling process shutting down"
        );

        let grace = self.config.shutdown_grace;
        for (name, task) in [
            ("dispatcher", dispatch_task),
            ("expansion", expansion_task),
            ("replan", replan_task),
        ] {
            match tokio::time::timeout(grace, task).await {
                Ok(_) => {}
                Err(_) => warn!(loop_name = name, "loop did not stop within the shutdown grace period"),
            }
        }
    }

    async fn expansion_loop(
        planner: Arc<QueuePlanner>,
        gc: Arc<CatalogueGc>,
        interval: Duration,
        retention: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) {
        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        return;
                    }
                }
                _ = tokio::time::sleep(interval) => {
                    let now = chrono::Utc::now();
                    if let Err(err) = planner.expand_window(now, interval).await {
                        warn!(error = %err, "queue expansion pass failed");
                    }
                    if let Err(err) = gc.sweep(now.timestamp(), retention.as_secs() as i64).await {
                        warn!(error = %err, "catalogue GC sweep failed");
                    }
                }
            }
        }
    }

    async fn replan_loop(
        planner: Arc<QueuePlanner>,
        mut replan_rx: ReplanReceiver,
        mut shutdown: watch::Receiver<bool>,
    ) {
        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        return;
                    }
                }
                request = replan_rx.recv() => {
                    let Some(request) = request else { return };
                    let now = chrono::Utc::now();
                    if let Err(err) = planner.replan_user(&request.user_id, now).await {
                        warn!(user_id = %request.user_id, error = %err, "replan failed");
                    }
                }
            }
        }
    }
}
