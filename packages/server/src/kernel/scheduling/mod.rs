//! Helper execution engine: scheduling and dispatch core.
//!
//! Components, leaves first: the Scheduling Store adapter, the Cron
//! Expander, the Helper Catalogue, the Execution Queue, the Queue Planner,
//! the Dispatcher, the Executor, and the per-user replan channel. The
//! process supervisor in [`worker`] wires all of these into three
//! cooperative loops.

pub mod catalogue;
pub mod cron;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod executor;
pub mod gc;
pub mod helper;
pub mod helpers;
pub mod job;
pub mod planner;
pub mod queue;
pub mod registry;
pub mod store;
pub mod user_directory;
pub mod worker;

pub use catalogue::{Catalogue, HelperDefinition, ParamType};
pub use dispatcher::Dispatcher;
pub use error::{Result, SchedulingError};
pub use events::{replan_channel, ReplanReceiver, ReplanRequest, ReplanSender};
pub use executor::Executor;
pub use gc::CatalogueGc;
pub use helper::{Helper, HelperContext};
pub use job::{JobRecord, JobStatus};
pub use planner::QueuePlanner;
pub use queue::ExecutionQueue;
pub use registry::HelperRegistry;
pub use store::{InMemorySchedulingStore, RedisSchedulingStore, SchedulingStore};
pub use user_directory::{
    GetUserOptions, InMemoryUserDirectory, RemoteUserDirectory, Subscription, UserDirectory,
    UserRecord, UserStatus,
};
pub use worker::{SchedulingProcess, SchedulingProcessConfig};
