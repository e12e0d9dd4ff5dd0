//! Built-in helper implementations plus the catalogue entries they pair
//! with. Bootstrapping is explicit, not dynamic — add a new helper by
//! registering it in [`builtin_helpers`] and [`builtin_definitions`].

pub mod check_in;

use std::collections::HashMap;
use std::sync::Arc;

use self::check_in::{CheckInHelper, CHECK_IN_ID};
use super::catalogue::HelperDefinition;
use super::helper::Helper;
use super::registry::HelperRegistry;

/// Every helper implementation shipped with this process, registered into a
/// fresh [`HelperRegistry`] at boot.
pub fn builtin_helpers(heartbeat_url: Option<String>) -> HelperRegistry {
    let mut registry = HelperRegistry::new();
    registry.register(Arc::new(CheckInHelper::new(heartbeat_url)) as Arc<dyn Helper>);
    registry
}

/// The catalogue entries matching [`builtin_helpers`], written to the
/// Scheduling Store at boot (`clear()` then re-register).
pub fn builtin_definitions() -> Vec<HelperDefinition> {
    vec![HelperDefinition {
        id: CHECK_IN_ID.to_string(),
        name: "Check In".to_string(),
        description: "Sends heartbeats to an uptime monitor on a CRON tick.".to_string(),
        params: HashMap::new(),
        internal: true,
        admin_only: false,
        require_admin_activation: false,
        boot_run: true,
        priority: 2,
        timeout: 120,
        allow_execution_time_config: false,
        schedule: vec!["*/2 * * * *".to_string()],
        disabled: false,
        region_lock: vec!["*".to_string()],
    }]
}
