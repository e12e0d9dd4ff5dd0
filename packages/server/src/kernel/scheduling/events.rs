//! Replan channel: per-user re-plan triggered from an HTTP handler.
//!
//! A Mutation API handler that changes a user's subscriptions publishes a
//! [`ReplanRequest`] to a single-consumer channel and returns immediately;
//! the scheduling process drains the channel and calls
//! [`QueuePlanner::replan_user`](super::planner::QueuePlanner::replan_user)
//! eventually-consistently, off the request path.

use tokio::sync::mpsc;

/// One pending re-plan, identified by owner id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplanRequest {
    pub user_id: String,
}

pub type ReplanSender = mpsc::UnboundedSender<ReplanRequest>;
pub type ReplanReceiver = mpsc::UnboundedReceiver<ReplanRequest>;

/// Builds the single-consumer replan channel shared between the Mutation
/// API handlers (producers) and the scheduling process (sole consumer).
pub fn replan_channel() -> (ReplanSender, ReplanReceiver) {
    mpsc::unbounded_channel()
}
