//! User Directory interface consumed by the core.
//!
//! Account management itself (signup, login, password, admin impersonation,
//! block/delete) is out of scope: the core only ever reads a user's
//! subscription state and, on mutation, writes it back verbatim.

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UserStatus {
    Active,
    Suspended,
    DeletionPending,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub helper_id: String,
    pub enabled: bool,
    pub params: HashMap<String, serde_json::Value>,
    /// Cron expressions; may be empty when the helper doesn't allow
    /// per-user schedule overrides.
    pub schedule: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    pub admin: bool,
    pub status: UserStatus,
    pub region: String,
    pub services: Vec<Subscription>,
}

impl UserRecord {
    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GetUserOptions {
    pub bypass_cache: bool,
    /// Raw form exposes the password hash; the core never uses this, but
    /// the option exists on the interface for callers that do.
    pub raw: bool,
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn get_user_by_id(
        &self,
        id: &str,
        options: GetUserOptions,
    ) -> anyhow::Result<Option<UserRecord>>;

    async fn get_all_active_users(&self) -> anyhow::Result<Vec<UserRecord>>;

    /// Writes the new record and invalidates caches (cache invalidation is
    /// the Directory's own responsibility, not the core's).
    async fn update_user(&self, id: &str, new_record: UserRecord) -> anyhow::Result<()>;
}

/// HTTP-backed [`UserDirectory`] talking to the external account-management
/// service named by `USER_DIRECTORY_URL`. Account management itself (signup,
/// login, block/delete) lives entirely behind this boundary; the core only
/// ever reads and rewrites the `services` subscription list.
pub struct RemoteUserDirectory {
    client: reqwest::Client,
    base_url: String,
}

impl RemoteUserDirectory {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl UserDirectory for RemoteUserDirectory {
    async fn get_user_by_id(
        &self,
        id: &str,
        options: GetUserOptions,
    ) -> anyhow::Result<Option<UserRecord>> {
        let url = format!("{}/users/{id}", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("bypassCache", options.bypass_cache.to_string()),
                ("raw", options.raw.to_string()),
            ])
            .send()
            .await
            .with_context(|| format!("user directory request failed: GET {url}"))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = response
            .error_for_status()
            .with_context(|| format!("user directory returned an error status: GET {url}"))?;
        Ok(Some(response.json::<UserRecord>().await.with_context(|| {
            format!("user directory returned a malformed user record: GET {url}")
        })?))
    }

    async fn get_all_active_users(&self) -> anyhow::Result<Vec<UserRecord>> {
        let url = format!("{}/users/active", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("user directory request failed: GET {url}"))?
            .error_for_status()
            .with_context(|| format!("user directory returned an error status: GET {url}"))?;
        response
            .json::<Vec<UserRecord>>()
            .await
            .with_context(|| format!("user directory returned a malformed user list: GET {url}"))
    }

    async fn update_user(&self, id: &str, new_record: UserRecord) -> anyhow::Result<()> {
        let url = format!("{}/users/{id}", self.base_url);
        self.client
            .put(&url)
            .json(&new_record)
            .send()
            .await
            .with_context(|| format!("user directory request failed: PUT {url}"))?
            .error_for_status()
            .with_context(|| format!("user directory returned an error status: PUT {url}"))?;
        Ok(())
    }
}

/// In-memory test double used by planner/dispatcher/executor tests.
#[derive(Default)]
pub struct InMemoryUserDirectory {
    users: RwLock<HashMap<String, UserRecord>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, user: UserRecord) {
        self.users.write().unwrap().insert(user.id.clone(), user);
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn get_user_by_id(
        &self,
        id: &str,
        _options: GetUserOptions,
    ) -> anyhow::Result<Option<UserRecord>> {
        Ok(self.users.read().unwrap().get(id).cloned())
    }

    async fn get_all_active_users(&self) -> anyhow::Result<Vec<UserRecord>> {
        Ok(self
            .users
            .read()
            .unwrap()
            .values()
            .filter(|u| u.is_active())
            .cloned()
            .collect())
    }

    async fn update_user(&self, id: &str, new_record: UserRecord) -> anyhow::Result<()> {
        self.users.write().unwrap().insert(id.to_string(), new_record);
        Ok(())
    }
}
