//! Scheduling Store adapter.
//!
//! An external key/value + sorted-set service: hashes keyed by job id, a
//! sorted set keyed by composite temporal-priority score, simple key/value
//! for the helper catalogue. All calls are fail-fast; a transport failure
//! propagates as [`SchedulingError::StoreTransportError`]. Single-command
//! atomicity is sufficient — no multi-key transactions are required.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use super::error::{Result, SchedulingError};

#[async_trait]
pub trait SchedulingStore: Send + Sync {
    async fn set_kv(&self, key: &str, value: &str) -> Result<()>;
    async fn get_kv(&self, key: &str) -> Result<Option<String>>;
    async fn del_key(&self, key: &str) -> Result<()>;
    async fn keys_by_prefix(&self, prefix: &str) -> Result<Vec<String>>;

    async fn hash_set(&self, key: &str, fields: HashMap<String, String>) -> Result<()>;
    async fn hash_get_all(&self, key: &str) -> Result<Option<HashMap<String, String>>>;
    async fn hash_set_field(&self, key: &str, field: &str, value: &str) -> Result<()>;

    /// Adds `member` to the sorted set `key` with `score` iff it is not
    /// already present. Returns `true` if the member was newly added.
    async fn zadd_if_absent(&self, key: &str, score: i64, member: &str) -> Result<bool>;
    async fn zrange_by_score_asc(
        &self,
        key: &str,
        min: i64,
        max: i64,
        limit: Option<usize>,
    ) -> Result<Vec<String>>;
    async fn zrem_member(&self, key: &str, member: &str) -> Result<()>;
    async fn zrange_all(&self, key: &str) -> Result<Vec<String>>;
}

// =============================================================================
// Redis-backed adapter
// =============================================================================

pub struct RedisSchedulingStore {
    pool: deadpool_redis::Pool,
}

impl RedisSchedulingStore {
    pub fn new(pool: deadpool_redis::Pool) -> Self {
        Self { pool }
    }

    pub fn from_url(url: &str) -> anyhow::Result<Self> {
        let cfg = deadpool_redis::Config::from_url(url);
        let pool = cfg.create_pool(Some(deadpool_redis::Runtime::Tokio1))?;
        Ok(Self::new(pool))
    }

    async fn conn(&self) -> Result<deadpool_redis::Connection> {
        self.pool.get().await.map_err(SchedulingError::from)
    }
}

#[async_trait]
impl SchedulingStore for RedisSchedulingStore {
    async fn set_kv(&self, key: &str, value: &str) -> Result<()> {
        use redis::AsyncCommands;
        let mut conn = self.conn().await?;
        conn.set::<_, _, ()>(key, value).await?;
        Ok(())
    }

    async fn get_kv(&self, key: &str) -> Result<Option<String>> {
        use redis::AsyncCommands;
        let mut conn = self.conn().await?;
        Ok(conn.get(key).await?)
    }

    async fn del_key(&self, key: &str) -> Result<()> {
        use redis::AsyncCommands;
        let mut conn = self.conn().await?;
        conn.del::<_, ()>(key).await?;
        Ok(())
    }

    async fn keys_by_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        use redis::AsyncCommands;
        let mut conn = self.conn().await?;
        let pattern = format!("{prefix}*");
        Ok(conn.keys(pattern).await?)
    }

    async fn hash_set(&self, key: &str, fields: HashMap<String, String>) -> Result<()> {
        use redis::AsyncCommands;
        if fields.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn().await?;
        let pairs: Vec<(String, String)> = fields.into_iter().collect();
        conn.hset_multiple::<_, _, _, ()>(key, &pairs).await?;
        Ok(())
    }

    async fn hash_get_all(&self, key: &str) -> Result<Option<HashMap<String, String>>> {
        use redis::AsyncCommands;
        let mut conn = self.conn().await?;
        let map: HashMap<String, String> = conn.hgetall(key).await?;
        if map.is_empty() {
            Ok(None)
        } else {
            Ok(Some(map))
        }
    }

    async fn hash_set_field(&self, key: &str, field: &str, value: &str) -> Result<()> {
        use redis::AsyncCommands;
        let mut conn = self.conn().await?;
        conn.hset::<_, _, _, ()>(key, field, value).await?;
        Ok(())
    }

    async fn zadd_if_absent(&self, key: &str, score: i64, member: &str) -> Result<bool> {
        use redis::AsyncCommands;
        let mut conn = self.conn().await?;
        // NX = add only if the member does not already exist.
        let added: i64 = redis::cmd("ZADD")
            .arg(key)
            .arg("NX")
            .arg(score)
            .arg(member)
            .query_async(&mut conn)
            .await?;
        Ok(added == 1)
    }

    async fn zrange_by_score_asc(
        &self,
        key: &str,
        min: i64,
        max: i64,
        limit: Option<usize>,
    ) -> Result<Vec<String>> {
        use redis::AsyncCommands;
        let mut conn = self.conn().await?;
        let members: Vec<String> = if let Some(limit) = limit {
            conn.zrangebyscore_limit(key, min, max, 0, limit as isize)
                .await?
        } else {
            conn.zrangebyscore(key, min, max).await?
        };
        Ok(members)
    }

    async fn zrem_member(&self, key: &str, member: &str) -> Result<()> {
        use redis::AsyncCommands;
        let mut conn = self.conn().await?;
        conn.zrem::<_, _, ()>(key, member).await?;
        Ok(())
    }

    async fn zrange_all(&self, key: &str) -> Result<Vec<String>> {
        use redis::AsyncCommands;
        let mut conn = self.conn().await?;
        Ok(conn.zrange(key, 0, -1).await?)
    }
}

// =============================================================================
// In-memory test double
// =============================================================================

/// Deterministic in-memory double for [`SchedulingStore`], used for planner
/// / dispatcher / executor tests without a live Redis.
#[derive(Default)]
pub struct InMemorySchedulingStore {
    kv: RwLock<HashMap<String, String>>,
    hashes: RwLock<HashMap<String, HashMap<String, String>>>,
    // sorted set name -> member -> score, plus a score-ordered index for range scans
    zsets: RwLock<HashMap<String, BTreeMap<(i64, String), ()>>>,
    zmembers: RwLock<HashMap<String, HashMap<String, i64>>>,
}

impl InMemorySchedulingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SchedulingStore for InMemorySchedulingStore {
    async fn set_kv(&self, key: &str, value: &str) -> Result<()> {
        self.kv
            .write()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn get_kv(&self, key: &str) -> Result<Option<String>> {
        Ok(self.kv.read().unwrap().get(key).cloned())
    }

    async fn del_key(&self, key: &str) -> Result<()> {
        self.kv.write().unwrap().remove(key);
        self.hashes.write().unwrap().remove(key);
        Ok(())
    }

    async fn keys_by_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let kv_keys = self
            .kv
            .read()
            .unwrap()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned();
        let hash_keys = self
            .hashes
            .read()
            .unwrap()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned();
        Ok(kv_keys.chain(hash_keys).collect())
    }

    async fn hash_set(&self, key: &str, fields: HashMap<String, String>) -> Result<()> {
        self.hashes
            .write()
            .unwrap()
            .entry(key.to_string())
            .or_default()
            .extend(fields);
        Ok(())
    }

    async fn hash_get_all(&self, key: &str) -> Result<Option<HashMap<String, String>>> {
        Ok(self.hashes.read().unwrap().get(key).cloned())
    }

    async fn hash_set_field(&self, key: &str, field: &str, value: &str) -> Result<()> {
        self.hashes
            .write()
            .unwrap()
            .entry(key.to_string())
            .or_default()
            .insert(field.to_string(), value.to_string());
        Ok(())
    }

    async fn zadd_if_absent(&self, key: &str, score: i64, member: &str) -> Result<bool> {
        let mut zmembers = self.zmembers.write().unwrap();
        let members = zmembers.entry(key.to_string()).or_default();
        if members.contains_key(member) {
            return Ok(false);
        }
        members.insert(member.to_string(), score);
        self.zsets
            .write()
            .unwrap()
            .entry(key.to_string())
            .or_default()
            .insert((score, member.to_string()), ());
        Ok(true)
    }

    async fn zrange_by_score_asc(
        &self,
        key: &str,
        min: i64,
        max: i64,
        limit: Option<usize>,
    ) -> Result<Vec<String>> {
        let zsets = self.zsets.read().unwrap();
        let Some(index) = zsets.get(key) else {
            return Ok(Vec::new());
        };
        let iter = index
            .range((min, String::new())..=(max, String::from("\u{10FFFF}")))
            .map(|((_, member), ())| member.clone());
        Ok(match limit {
            Some(limit) => iter.take(limit).collect(),
            None => iter.collect(),
        })
    }

    async fn zrem_member(&self, key: &str, member: &str) -> Result<()> {
        if let Some(score) = self
            .zmembers
            .write()
            .unwrap()
            .get_mut(key)
            .and_then(|m| m.remove(member))
        {
            self.zsets
                .write()
                .unwrap()
                .entry(key.to_string())
                .or_default()
                .remove(&(score, member.to_string()));
        }
        Ok(())
    }

    async fn zrange_all(&self, key: &str) -> Result<Vec<String>> {
        let zsets = self.zsets.read().unwrap();
        Ok(zsets
            .get(key)
            .map(|index| index.keys().map(|(_, member)| member.clone()).collect())
            .unwrap_or_default())
    }
}
