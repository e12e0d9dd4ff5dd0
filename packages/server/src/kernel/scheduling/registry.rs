//! Compile-time Helper registry.
//!
//! An explicit, statically-built table: every helper implementation is
//! registered once at process init and looked up by id at dispatch time.
//! No dynamic linking, no reflection.

use std::collections::HashMap;
use std::sync::Arc;

use super::helper::Helper;

/// Lookup table of `Arc<dyn Helper>` by id, built once at process init.
#[derive(Default, Clone)]
pub struct HelperRegistry {
    helpers: HashMap<String, Arc<dyn Helper>>,
}

impl HelperRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, helper: Arc<dyn Helper>) {
        self.helpers.insert(helper.id().to_string(), helper);
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn Helper>> {
        self.helpers.get(id).cloned()
    }

    pub fn ids(&self) -> Vec<String> {
        self.helpers.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.helpers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.helpers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::scheduling::helper::HelperContext;
    use async_trait::async_trait;

    struct Noop(&'static str);

    #[async_trait]
    impl Helper for Noop {
        fn id(&self) -> &str {
            self.0
        }

        async fn run(&self, _ctx: HelperContext) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn register_and_lookup_by_id() {
        let mut registry = HelperRegistry::new();
        registry.register(Arc::new(Noop("checkIn")));
        assert!(registry.get("checkIn").is_some());
        assert!(registry.get("missing").is_none());
        assert_eq!(registry.len(), 1);
    }
}
