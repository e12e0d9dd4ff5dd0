//! Validates Mutation API requests against the Catalogue and a user's
//! current subscription state, writes the result back through the
//! [`UserDirectory`], and schedules a background re-plan.

use std::sync::Arc;

use chrono::{Duration, Utc};

use crate::kernel::scheduling::{
    Catalogue, ParamType, ReplanRequest, ReplanSender, Subscription, UserDirectory, UserRecord,
};

use super::requests::{AdminToggleRequest, MutationError, RegisterHelperRequest, UpdateHelperRequest};

pub struct HelperMutationService {
    catalogue: Arc<Catalogue>,
    user_directory: Arc<dyn UserDirectory>,
    replan_tx: ReplanSender,
}

impl HelperMutationService {
    pub fn new(
        catalogue: Arc<Catalogue>,
        user_directory: Arc<dyn UserDirectory>,
        replan_tx: ReplanSender,
    ) -> Self {
        Self {
            catalogue,
            user_directory,
            replan_tx,
        }
    }

    /// Registers the caller's subscription to a helper.
    pub async fn register(
        &self,
        subject_id: &str,
        caller_is_admin: bool,
        helper_id: &str,
        request: RegisterHelperRequest,
    ) -> Result<(), MutationError> {
        let mut user = self.load_subject(subject_id).await?;
        let definition = self.validated_definition(helper_id, caller_is_admin).await?;
        validate_params(helper_id, &definition.params, &request.params)?;
        validate_schedule(&request.schedule)?;
        if !request.schedule.is_empty() && !definition.allow_execution_time_config {
            return Err(MutationError::ScheduleOverrideNotAllowed(helper_id.to_string()));
        }

        if user.services.iter().any(|s| s.helper_id == helper_id) {
            return Err(MutationError::AlreadyRegistered {
                helper_id: helper_id.to_string(),
            });
        }

        user.services.push(Subscription {
            helper_id: helper_id.to_string(),
            enabled: true,
            params: request.params,
            schedule: request.schedule,
        });
        self.persist_and_replan(subject_id, user).await
    }

    /// Removes the caller's subscription to a helper.
    pub async fn unregister(&self, subject_id: &str, helper_id: &str) -> Result<(), MutationError> {
        let mut user = self.load_subject(subject_id).await?;
        let before = user.services.len();
        user.services.retain(|s| s.helper_id != helper_id);
        if user.services.len() == before {
            return Err(MutationError::NotRegistered {
                helper_id: helper_id.to_string(),
            });
        }
        self.persist_and_replan(subject_id, user).await
    }

    /// Merges `params` and `schedule` into the caller's existing
    /// subscription to a helper.
    pub async fn update(
        &self,
        subject_id: &str,
        caller_is_admin: bool,
        helper_id: &str,
        request: UpdateHelperRequest,
    ) -> Result<(), MutationError> {
        let mut user = self.load_subject(subject_id).await?;
        let definition = self.validated_definition(helper_id, caller_is_admin).await?;

        let Some(subscription) = user.services.iter_mut().find(|s| s.helper_id == helper_id) else {
            return Err(MutationError::NotRegistered {
                helper_id: helper_id.to_string(),
            });
        };

        if let Some(params) = &request.params {
            validate_params(helper_id, &definition.params, params)?;
        }
        if let Some(schedule) = &request.schedule {
            validate_schedule(schedule)?;
            if !schedule.is_empty() && !definition.allow_execution_time_config {
                return Err(MutationError::ScheduleOverrideNotAllowed(helper_id.to_string()));
            }
        }

        if let Some(params) = request.params {
            subscription.params.extend(params);
        }
        if let Some(schedule) = request.schedule {
            subscription.schedule = schedule;
        }
        self.persist_and_replan(subject_id, user).await
    }

    /// Flips a catalogue entry's `disabled` flag. The planner ignores a
    /// disabled helper on its next pass; no immediate dequeue.
    pub async fn admin_toggle(
        &self,
        caller_is_admin: bool,
        helper_id: &str,
        request: AdminToggleRequest,
    ) -> Result<(), MutationError> {
        if !caller_is_admin {
            return Err(MutationError::NotAnAdmin);
        }
        let mut definition = self
            .catalogue
            .get(helper_id)
            .await
            .map_err(|err| MutationError::Directory(anyhow::anyhow!(err)))?
            .ok_or_else(|| MutationError::UnknownHelper(helper_id.to_string()))?;
        definition.disabled = request.disabled;
        self.catalogue
            .register(&definition)
            .await
            .map_err(|err| MutationError::Directory(anyhow::anyhow!(err)))?;
        Ok(())
    }

    async fn load_subject(&self, subject_id: &str) -> Result<UserRecord, MutationError> {
        self.user_directory
            .get_user_by_id(subject_id, Default::default())
            .await?
            .ok_or_else(|| MutationError::UnknownUser(subject_id.to_string()))
    }

    /// Shared gating for register/update: the helper must exist, be
    /// enabled, and (if `admin_only`/`require_admin_activation`) only be
    /// reachable through an admin caller. `require_admin_activation` gates
    /// the same way as `admin_only` at subscription time — once a
    /// subscription exists in `user.services` it has already cleared this
    /// gate and the planner never re-checks it.
    async fn validated_definition(
        &self,
        helper_id: &str,
        caller_is_admin: bool,
    ) -> Result<crate::kernel::scheduling::HelperDefinition, MutationError> {
        let definition = self
            .catalogue
            .get(helper_id)
            .await
            .map_err(|err| MutationError::Directory(anyhow::anyhow!(err)))?
            .ok_or_else(|| MutationError::UnknownHelper(helper_id.to_string()))?;
        if definition.disabled {
            return Err(MutationError::HelperDisabled(helper_id.to_string()));
        }
        if definition.admin_only && !caller_is_admin {
            return Err(MutationError::AdminOnly(helper_id.to_string()));
        }
        if definition.require_admin_activation && !caller_is_admin {
            return Err(MutationError::RequiresAdminActivation(helper_id.to_string()));
        }
        Ok(definition)
    }

    async fn persist_and_replan(&self, subject_id: &str, user: UserRecord) -> Result<(), MutationError> {
        self.user_directory.update_user(subject_id, user).await?;
        let _ = self.replan_tx.send(ReplanRequest {
            user_id: subject_id.to_string(),
        });
        Ok(())
    }
}

fn validate_params(
    helper_id: &str,
    schema: &std::collections::HashMap<String, ParamType>,
    params: &std::collections::HashMap<String, serde_json::Value>,
) -> Result<(), MutationError> {
    for (name, value) in params {
        let Some(declared) = schema.get(name) else {
            return Err(MutationError::UnknownParam {
                helper_id: helper_id.to_string(),
                param: name.clone(),
            });
        };
        let matches = match declared {
            ParamType::String => value.is_string(),
            ParamType::Integer => value.is_i64() || value.is_u64(),
            ParamType::Boolean => value.is_boolean(),
        };
        if !matches {
            return Err(MutationError::ParamTypeMismatch {
                helper_id: helper_id.to_string(),
                param: name.clone(),
                expected: match declared {
                    ParamType::String => "string",
                    ParamType::Integer => "integer",
                    ParamType::Boolean => "boolean",
                },
            });
        }
    }
    Ok(())
}

fn validate_schedule(schedule: &[String]) -> Result<(), MutationError> {
    let now = Utc::now();
    for expression in schedule {
        crate::kernel::scheduling::cron::expand(expression, now, now + Duration::seconds(1))
            .map_err(|_| MutationError::InvalidCron(expression.clone()))?;
    }
    Ok(())
}
