//! PresenceStore port - durable stall presence shared across instances.
//!
//! The store records, per stall, the set of user ids currently present and
//! whether the stall's vendor has announced itself online. It is the only
//! state shared across server processes; room membership stays in-process.
//!
//! Occupancy is partitioned per store handle: every handle represents one
//! server instance and writes only its own partition, while reads union all
//! partitions. Reconciliation therefore never deletes presence recorded by
//! another instance, and a partition whose owner stops renewing it (crash,
//! shutdown) ages out on the store side.
//!
//! Implementations need atomic per-key set-add/set-remove, nothing more.
//! No cross-key transactions are required, and callers treat every failure
//! as non-fatal: presence degrades to staleness, never to a broken
//! connection.

use async_trait::async_trait;

use crate::domain::foundation::{StallId, UserId};

/// Errors from the presence store.
#[derive(Debug, thiserror::Error)]
pub enum PresenceStoreError {
    /// The store could not be reached or the operation timed out.
    #[error("Presence store unavailable: {0}")]
    Unavailable(String),
}

/// Port for the durable presence key-value store.
#[async_trait]
pub trait PresenceStore: Send + Sync {
    /// Adds a user to this handle's partition of the stall's online set.
    async fn add_user(&self, stall_id: &StallId, user_id: &UserId)
        -> Result<(), PresenceStoreError>;

    /// Removes a user from this handle's partition.
    ///
    /// Removing a user that is not recorded is a no-op.
    async fn remove_user(
        &self,
        stall_id: &StallId,
        user_id: &UserId,
    ) -> Result<(), PresenceStoreError>;

    /// Returns the user ids recorded as present in the stall, unioned
    /// across every instance's partition.
    async fn users_in_stall(&self, stall_id: &StallId) -> Result<Vec<UserId>, PresenceStoreError>;

    /// Returns only the user ids this handle itself recorded.
    ///
    /// Reconciliation compares and deletes within its own partition; other
    /// instances' entries are never candidates.
    async fn own_users_in_stall(
        &self,
        stall_id: &StallId,
    ) -> Result<Vec<UserId>, PresenceStoreError>;

    /// Renews the liveness of this handle's occupancy records for a stall.
    ///
    /// Called on every reconciliation tick. A partition that stops being
    /// renewed expires store-side, which is what cleans up after a crashed
    /// instance.
    async fn refresh_occupancy(&self, stall_id: &StallId) -> Result<(), PresenceStoreError>;

    /// Sets the vendor-online flag for the stall.
    async fn set_vendor_online(
        &self,
        stall_id: &StallId,
        online: bool,
    ) -> Result<(), PresenceStoreError>;

    /// Reads the vendor-online flag for the stall.
    ///
    /// A stall with no recorded flag reads as offline.
    async fn vendor_online(&self, stall_id: &StallId) -> Result<bool, PresenceStoreError>;
}
