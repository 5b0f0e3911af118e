//! In-memory presence store for tests and single-process development.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::foundation::{StallId, UserId};
use crate::ports::{PresenceStore, PresenceStoreError};

#[derive(Default)]
struct StallEntry {
    /// Occupants, partitioned by the instance id of the handle that
    /// recorded them.
    occupants: HashMap<Uuid, HashSet<UserId>>,
    vendor_online: bool,
}

#[derive(Default)]
struct Shared {
    stalls: HashMap<StallId, StallEntry>,
}

/// In-memory implementation of the presence store.
///
/// Mirrors the Redis adapter's semantics: each handle writes its own
/// occupancy partition, reads union all partitions, and an unknown stall
/// reads as empty/offline. `attach()` creates a second handle over the same
/// stored state, acting as another server instance. `with_outage()` turns
/// every operation into a failure for degradation tests.
///
/// Partitions never expire here: everything lives in one process, so a
/// crashed "instance" cannot outlive its handle.
pub struct InMemoryPresenceStore {
    shared: Arc<RwLock<Shared>>,
    instance_id: Uuid,
    outage: bool,
}

impl InMemoryPresenceStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            shared: Arc::default(),
            instance_id: Uuid::new_v4(),
            outage: false,
        }
    }

    /// Create another handle over the same stored state, with its own
    /// occupancy partition.
    pub fn attach(&self) -> Self {
        Self {
            shared: self.shared.clone(),
            instance_id: Uuid::new_v4(),
            outage: false,
        }
    }

    /// Make every operation fail, simulating an unreachable store.
    pub fn with_outage(mut self) -> Self {
        self.outage = true;
        self
    }

    fn check_outage(&self) -> Result<(), PresenceStoreError> {
        if self.outage {
            return Err(PresenceStoreError::Unavailable(
                "simulated outage".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for InMemoryPresenceStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PresenceStore for InMemoryPresenceStore {
    async fn add_user(
        &self,
        stall_id: &StallId,
        user_id: &UserId,
    ) -> Result<(), PresenceStoreError> {
        self.check_outage()?;
        let mut shared = self.shared.write().await;
        shared
            .stalls
            .entry(stall_id.clone())
            .or_default()
            .occupants
            .entry(self.instance_id)
            .or_default()
            .insert(user_id.clone());
        Ok(())
    }

    async fn remove_user(
        &self,
        stall_id: &StallId,
        user_id: &UserId,
    ) -> Result<(), PresenceStoreError> {
        self.check_outage()?;
        let mut shared = self.shared.write().await;
        if let Some(entry) = shared.stalls.get_mut(stall_id) {
            if let Some(partition) = entry.occupants.get_mut(&self.instance_id) {
                partition.remove(user_id);
            }
        }
        Ok(())
    }

    async fn users_in_stall(&self, stall_id: &StallId) -> Result<Vec<UserId>, PresenceStoreError> {
        self.check_outage()?;
        let shared = self.shared.read().await;
        Ok(shared
            .stalls
            .get(stall_id)
            .map(|entry| {
                entry
                    .occupants
                    .values()
                    .flatten()
                    .cloned()
                    .collect::<HashSet<_>>()
                    .into_iter()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn own_users_in_stall(
        &self,
        stall_id: &StallId,
    ) -> Result<Vec<UserId>, PresenceStoreError> {
        self.check_outage()?;
        let shared = self.shared.read().await;
        Ok(shared
            .stalls
            .get(stall_id)
            .and_then(|entry| entry.occupants.get(&self.instance_id))
            .map(|partition| partition.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn refresh_occupancy(&self, _stall_id: &StallId) -> Result<(), PresenceStoreError> {
        // No expiry in-process; the call only has to honor outage mode.
        self.check_outage()
    }

    async fn set_vendor_online(
        &self,
        stall_id: &StallId,
        online: bool,
    ) -> Result<(), PresenceStoreError> {
        self.check_outage()?;
        let mut shared = self.shared.write().await;
        shared
            .stalls
            .entry(stall_id.clone())
            .or_default()
            .vendor_online = online;
        Ok(())
    }

    async fn vendor_online(&self, stall_id: &StallId) -> Result<bool, PresenceStoreError> {
        self.check_outage()?;
        let shared = self.shared.read().await;
        Ok(shared
            .stalls
            .get(stall_id)
            .map(|entry| entry.vendor_online)
            .unwrap_or(false))
    }
}
