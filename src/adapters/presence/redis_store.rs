//! Redis-backed presence store for production deployments.
//!
//! Occupancy is partitioned per server instance so one instance's
//! reconciliation can never delete presence recorded by another:
//!
//! - `stall:{stallId}:users:{instanceId}` — this instance's occupant set,
//!   written only by its owner and expiring unless renewed
//! - `stall:{stallId}:instances` — index of instance ids with occupants,
//!   unioned on read; ids of expired instances read as empty sets and age
//!   out with the index key
//! - `stall:{stallId}:vendor_online` — `"true"` / `"false"` string, shared
//!
//! All operations are single-key and atomic on the Redis side; no
//! transactions are needed. Every call is wrapped in a bounded timeout so a
//! slow store degrades presence instead of stalling connection handlers.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use uuid::Uuid;

use crate::domain::foundation::{StallId, UserId};
use crate::ports::{PresenceStore, PresenceStoreError};

const DEFAULT_OP_TIMEOUT: Duration = Duration::from_secs(3);
const DEFAULT_OCCUPANCY_TTL: Duration = Duration::from_secs(180);

/// Redis implementation of the presence store.
#[derive(Clone)]
pub struct RedisPresenceStore {
    conn: MultiplexedConnection,
    instance_id: Uuid,
    op_timeout: Duration,
    occupancy_ttl: Duration,
}

impl RedisPresenceStore {
    /// Create a new store over an established connection, with a fresh
    /// instance identity.
    pub fn new(conn: MultiplexedConnection) -> Self {
        Self {
            conn,
            instance_id: Uuid::new_v4(),
            op_timeout: DEFAULT_OP_TIMEOUT,
            occupancy_ttl: DEFAULT_OCCUPANCY_TTL,
        }
    }

    /// Override the per-operation timeout.
    pub fn with_op_timeout(mut self, op_timeout: Duration) -> Self {
        self.op_timeout = op_timeout;
        self
    }

    /// Override how long this instance's occupancy records outlive their
    /// last renewal. Must comfortably exceed the reconciliation interval.
    pub fn with_occupancy_ttl(mut self, occupancy_ttl: Duration) -> Self {
        self.occupancy_ttl = occupancy_ttl;
        self
    }

    fn users_key(stall_id: &StallId, instance: &str) -> String {
        format!("stall:{}:users:{}", stall_id, instance)
    }

    fn instances_key(stall_id: &StallId) -> String {
        format!("stall:{}:instances", stall_id)
    }

    fn vendor_key(stall_id: &StallId) -> String {
        format!("stall:{}:vendor_online", stall_id)
    }

    fn own_users_key(&self, stall_id: &StallId) -> String {
        Self::users_key(stall_id, &self.instance_id.to_string())
    }

    fn ttl_secs(&self) -> i64 {
        self.occupancy_ttl.as_secs() as i64
    }

    async fn bounded<T>(
        &self,
        op: impl std::future::Future<Output = Result<T, redis::RedisError>>,
    ) -> Result<T, PresenceStoreError> {
        match tokio::time::timeout(self.op_timeout, op).await {
            Ok(result) => result.map_err(|e| PresenceStoreError::Unavailable(e.to_string())),
            Err(_) => Err(PresenceStoreError::Unavailable(format!(
                "operation timed out after {:?}",
                self.op_timeout
            ))),
        }
    }
}

#[async_trait]
impl PresenceStore for RedisPresenceStore {
    async fn add_user(
        &self,
        stall_id: &StallId,
        user_id: &UserId,
    ) -> Result<(), PresenceStoreError> {
        let mut conn = self.conn.clone();
        let users_key = self.own_users_key(stall_id);
        let instances_key = Self::instances_key(stall_id);
        let instance = self.instance_id.to_string();
        let ttl = self.ttl_secs();
        self.bounded(async move {
            conn.sadd::<_, _, ()>(&users_key, user_id.as_str()).await?;
            conn.sadd::<_, _, ()>(&instances_key, instance).await?;
            conn.expire::<_, ()>(&users_key, ttl).await?;
            conn.expire::<_, ()>(&instances_key, ttl).await
        })
        .await
    }

    async fn remove_user(
        &self,
        stall_id: &StallId,
        user_id: &UserId,
    ) -> Result<(), PresenceStoreError> {
        let mut conn = self.conn.clone();
        let key = self.own_users_key(stall_id);
        self.bounded(async move { conn.srem::<_, _, ()>(key, user_id.as_str()).await })
            .await
    }

    async fn users_in_stall(&self, stall_id: &StallId) -> Result<Vec<UserId>, PresenceStoreError> {
        let mut conn = self.conn.clone();
        let instances_key = Self::instances_key(stall_id);
        let stall = stall_id.clone();
        let members: Vec<String> = self
            .bounded(async move {
                let instances: Vec<String> = conn.smembers(&instances_key).await?;
                let mut all: HashSet<String> = HashSet::new();
                for instance in instances {
                    let users: Vec<String> =
                        conn.smembers(Self::users_key(&stall, &instance)).await?;
                    all.extend(users);
                }
                Ok::<_, redis::RedisError>(all.into_iter().collect::<Vec<String>>())
            })
            .await?;

        // Empty member strings cannot occur through this adapter; drop any
        // rather than failing the whole read.
        Ok(members
            .into_iter()
            .filter_map(|id| UserId::new(id).ok())
            .collect())
    }

    async fn own_users_in_stall(
        &self,
        stall_id: &StallId,
    ) -> Result<Vec<UserId>, PresenceStoreError> {
        let mut conn = self.conn.clone();
        let key = self.own_users_key(stall_id);
        let members: Vec<String> = self
            .bounded(async move { conn.smembers(key).await })
            .await?;

        Ok(members
            .into_iter()
            .filter_map(|id| UserId::new(id).ok())
            .collect())
    }

    async fn refresh_occupancy(&self, stall_id: &StallId) -> Result<(), PresenceStoreError> {
        let mut conn = self.conn.clone();
        let users_key = self.own_users_key(stall_id);
        let instances_key = Self::instances_key(stall_id);
        let ttl = self.ttl_secs();
        // EXPIRE on a missing key is a no-op, which is exactly right when
        // this instance has no occupants recorded for the stall.
        self.bounded(async move {
            conn.expire::<_, ()>(&users_key, ttl).await?;
            conn.expire::<_, ()>(&instances_key, ttl).await
        })
        .await
    }

    async fn set_vendor_online(
        &self,
        stall_id: &StallId,
        online: bool,
    ) -> Result<(), PresenceStoreError> {
        let mut conn = self.conn.clone();
        let key = Self::vendor_key(stall_id);
        let value = if online { "true" } else { "false" };
        self.bounded(async move { conn.set::<_, _, ()>(key, value).await })
            .await
    }

    async fn vendor_online(&self, stall_id: &StallId) -> Result<bool, PresenceStoreError> {
        let mut conn = self.conn.clone();
        let key = Self::vendor_key(stall_id);
        let value: Option<String> = self.bounded(async move { conn.get(key).await }).await?;
        Ok(value.as_deref() == Some("true"))
    }
}

impl std::fmt::Debug for RedisPresenceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisPresenceStore")
            .field("instance_id", &self.instance_id)
            .field("op_timeout", &self.op_timeout)
            .field("occupancy_ttl", &self.occupancy_ttl)
            .finish_non_exhaustive()
    }
}
