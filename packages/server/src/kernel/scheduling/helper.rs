//! Helper capability set.
//!
//! A helper is a value implementing [`Helper`] plus a
//! [`HelperDefinition`](super::catalogue::HelperDefinition) describing it.
//! Helpers self-register into the [`HelperRegistry`](super::registry::HelperRegistry)
//! at process init — there is no dynamic module import.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

use super::user_directory::UserRecord;

/// Everything the dispatcher/executor need to run a helper invocation: the
/// resolved owner (or `None` for `internal` Jobs) and the subscription's
/// parameter map.
pub struct HelperContext {
    pub user: Option<UserRecord>,
    pub params: HashMap<String, Value>,
}

/// A runnable helper. `run` performs the helper's actual work; it is handed
/// a [`HelperContext`] bound to the specific owner and parameters of one Job.
///
/// Implementations should treat cancellation (the future being dropped) as
/// the Executor's cooperative timeout signal and stop at their next
/// suspension point rather than relying on an explicit "please stop" flag.
#[async_trait]
pub trait Helper: Send + Sync {
    /// Stable id matching the catalogue entry this helper implements.
    fn id(&self) -> &str;

    async fn run(&self, ctx: HelperContext) -> anyhow::Result<()>;
}
