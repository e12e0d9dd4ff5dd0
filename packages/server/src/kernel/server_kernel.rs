//! Process-wide dependency container.
//!
//! Constructed once at process init and passed explicitly; no global
//! mutable state inside the core.
//!
//! `main` builds one [`SchedulingKernel`] and hands clones of its `Arc`
//! fields to the HTTP router and the [`SchedulingProcess`](super::scheduling::SchedulingProcess)
//! supervisor; neither reaches for ambient statics.

use std::sync::Arc;

use super::scheduling::{Catalogue, ExecutionQueue, HelperRegistry, ReplanSender, SchedulingStore, UserDirectory};

#[derive(Clone)]
pub struct SchedulingKernel {
    pub store: Arc<dyn SchedulingStore>,
    pub catalogue: Arc<Catalogue>,
    pub queue: Arc<ExecutionQueue>,
    pub user_directory: Arc<dyn UserDirectory>,
    pub registry: Arc<HelperRegistry>,
    pub replan_tx: ReplanSender,
}

impl SchedulingKernel {
    pub fn new(
        store: Arc<dyn SchedulingStore>,
        catalogue: Arc<Catalogue>,
        queue: Arc<ExecutionQueue>,
        user_directory: Arc<dyn UserDirectory>,
        registry: Arc<HelperRegistry>,
        replan_tx: ReplanSender,
    ) -> Self {
        Self {
            store,
            catalogue,
            queue,
            user_directory,
            registry,
            replan_tx,
        }
    }
}
