//! Helper Catalogue.
//!
//! In-store registry of all helper definitions discovered at boot. Source of
//! truth for dispatch: the planner and dispatcher only ever consult the
//! catalogue entry for a helper, never the compiled [`Helper`](super::helper::Helper)
//! implementation's own idea of its configuration.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use super::error::Result;
use super::store::SchedulingStore;

pub const HELPER_KEY_PREFIX: &str = "internalAvailableHelpers:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
    Boolean,
}

/// Catalogue entry: a helper's declared configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HelperDefinition {
    pub id: String,
    pub name: String,
    pub description: String,
    pub params: HashMap<String, ParamType>,
    /// Runs without a user, under the synthetic owner `internal`.
    pub internal: bool,
    pub admin_only: bool,
    pub require_admin_activation: bool,
    /// Enqueue once at boot (and at every subsequent planning pass for the
    /// same owner), in addition to any cron-derived Jobs.
    pub boot_run: bool,
    /// 1..5, 1 highest.
    pub priority: u8,
    /// Upper bound of one invocation, in seconds.
    pub timeout: i64,
    /// Whether a user may override `schedule` with their own cron list.
    pub allow_execution_time_config: bool,
    /// Cron expressions; empty if `allow_execution_time_config` and no
    /// catalogue-level default is meaningful.
    pub schedule: Vec<String>,
    pub disabled: bool,
    /// Region codes, or `["*"]` to disable the check.
    pub region_lock: Vec<String>,
}

impl HelperDefinition {
    pub fn region_allowed(&self, region: &str) -> bool {
        self.region_lock.iter().any(|r| r == "*") || self.region_lock.iter().any(|r| r == region)
    }
}

/// In-store registry of helper definitions.
pub struct Catalogue {
    store: Arc<dyn SchedulingStore>,
}

impl Catalogue {
    pub fn new(store: Arc<dyn SchedulingStore>) -> Self {
        Self { store }
    }

    fn key(id: &str) -> String {
        format!("{HELPER_KEY_PREFIX}{id}")
    }

    /// Idempotent: repeated register overwrites.
    pub async fn register(&self, helper: &HelperDefinition) -> Result<()> {
        let json = serde_json::to_string(helper).expect("HelperDefinition always serializes");
        self.store.set_kv(&Self::key(&helper.id), &json).await
    }

    pub async fn get(&self, id: &str) -> Result<Option<HelperDefinition>> {
        let Some(raw) = self.store.get_kv(&Self::key(id)).await? else {
            return Ok(None);
        };
        Ok(serde_json::from_str(&raw).ok())
    }

    pub async fn all(&self) -> Result<Vec<HelperDefinition>> {
        let keys = self.store.keys_by_prefix(HELPER_KEY_PREFIX).await?;
        let mut out = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(raw) = self.store.get_kv(&key).await? {
                if let Ok(def) = serde_json::from_str(&raw) {
                    out.push(def);
                }
            }
        }
        Ok(out)
    }

    /// Deletes every catalogue entry. Called once on startup before
    /// re-registration, to avoid stale entries from a previous build.
    pub async fn clear(&self) -> Result<()> {
        let keys = self.store.keys_by_prefix(HELPER_KEY_PREFIX).await?;
        for key in keys {
            self.store.del_key(&key).await?;
        }
        Ok(())
    }
}
