//! Request/response DTOs for the Mutation API, and the error taxonomy its
//! synchronous validation path surfaces to callers. Validation errors
//! surface synchronously and leave the queue untouched until they pass.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Deserialize)]
pub struct RegisterHelperRequest {
    #[serde(default)]
    pub params: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub schedule: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateHelperRequest {
    pub params: Option<HashMap<String, serde_json::Value>>,
    pub schedule: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct AdminToggleRequest {
    pub disabled: bool,
}

#[derive(Debug, Serialize)]
pub struct SubscriptionResponse {
    pub helper_id: String,
    pub enabled: bool,
    pub params: HashMap<String, serde_json::Value>,
    pub schedule: Vec<String>,
}

/// Validation/authorization failures from the Mutation API's synchronous
/// path. Distinct from [`SchedulingError`](crate::kernel::scheduling::SchedulingError):
/// nothing inside the core ever returns one of these, only the boundary.
#[derive(Debug, Error)]
pub enum MutationError {
    #[error("helper '{0}' is not in the catalogue")]
    UnknownHelper(String),

    #[error("helper '{0}' is disabled")]
    HelperDisabled(String),

    #[error("helper '{0}' requires admin activation")]
    RequiresAdminActivation(String),

    #[error("helper '{0}' is admin-only")]
    AdminOnly(String),

    #[error("user '{0}' not found")]
    UnknownUser(String),

    #[error("helper '{helper_id}' already registered for this user")]
    AlreadyRegistered { helper_id: String },

    #[error("helper '{helper_id}' is not registered for this user")]
    NotRegistered { helper_id: String },

    #[error("invalid cron expression '{0}'")]
    InvalidCron(String),

    #[error("unknown parameter '{param}' for helper '{helper_id}'")]
    UnknownParam { helper_id: String, param: String },

    #[error("parameter '{param}' for helper '{helper_id}' must be of type {expected}")]
    ParamTypeMismatch {
        helper_id: String,
        param: String,
        expected: &'static str,
    },

    #[error("helper '{0}' does not allow a per-user schedule override")]
    ScheduleOverrideNotAllowed(String),

    #[error("caller is not an administrator")]
    NotAnAdmin,

    #[error(transparent)]
    Directory(#[from] anyhow::Error),
}
