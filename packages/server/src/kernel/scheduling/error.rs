//! Error taxonomy for the scheduling core.
//!
//! Nothing inside the scheduling subsystem propagates to a request caller:
//! every failure here is either absorbed by a loop (logged, job status
//! flipped) or surfaced synchronously by the Mutation API's validation path.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchedulingError {
    /// A Scheduling Store call failed at the network/transport layer.
    /// Retried locally by the dispatcher tick; never surfaced to callers.
    #[error("scheduling store transport error: {0}")]
    StoreTransportError(String),

    /// An expression in a Helper Definition or user subscription does not
    /// parse. Logged at warn, the offending expression is skipped.
    #[error("invalid cron expression '{0}'")]
    InvalidCronExpression(String),

    /// A Job's `helperId` is not in the catalogue at dispatch time.
    #[error("helper '{0}' not found in catalogue")]
    HelperNotFound(String),

    /// A Job's non-`internal` `userId` cannot be resolved.
    #[error("user '{0}' not found")]
    UserNotFound(String),

    /// Executor observed `executionExpiry`.
    #[error("execution deadline exceeded after {0:?}")]
    DeadlineExceeded(std::time::Duration),

    /// Any exception from the helper's `run`.
    #[error("helper runtime error: {0}")]
    HelperRuntimeError(String),
}

impl From<redis::RedisError> for SchedulingError {
    fn from(err: redis::RedisError) -> Self {
        SchedulingError::StoreTransportError(err.to_string())
    }
}

impl From<deadpool_redis::PoolError> for SchedulingError {
    fn from(err: deadpool_redis::PoolError) -> Self {
        SchedulingError::StoreTransportError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SchedulingError>;
