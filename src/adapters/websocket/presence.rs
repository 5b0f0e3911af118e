//! Presence coordinator: join/leave choreography for stall rooms.
//!
//! Orchestrates the registry and the durable presence store:
//!
//! ```text
//! join_stall ──► registry room join ──► store SADD ──► user_entered
//!                                                      (room, minus joiner)
//!                                  └──► store vendor flag ──► vendor_presence
//!                                                             (joiner only, replay)
//! ```
//!
//! Presence-store failures never break the connection: room broadcast
//! semantics are unaffected and only the durable/replay aspect degrades.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use crate::domain::foundation::{StallId, UserId};
use crate::domain::presence::{ParticipantRole, VendorStatus};
use crate::ports::PresenceStore;

use super::events::ServerEvent;
use super::registry::{ConnectionId, ConnectionRegistry, RoomId};

/// Drives stall-room presence: membership, durable occupancy, vendor status.
///
/// Constructed once at startup and injected wherever presence events are
/// handled; owns no transport state of its own.
pub struct PresenceCoordinator {
    registry: Arc<ConnectionRegistry>,
    store: Arc<dyn PresenceStore>,
    /// Stalls with presence traffic on this instance; the reconciliation
    /// sweep walks these instead of enumerating store keys, and drops a
    /// stall once it is empty both in the room and in the store partition.
    touched_stalls: RwLock<HashSet<StallId>>,
}

impl PresenceCoordinator {
    /// Create a new coordinator over the given registry and store.
    pub fn new(registry: Arc<ConnectionRegistry>, store: Arc<dyn PresenceStore>) -> Self {
        Self {
            registry,
            store,
            touched_stalls: RwLock::new(HashSet::new()),
        }
    }

    /// Handle a `join_stall` event.
    ///
    /// Room membership is updated first; the durable write and the replay
    /// read are best-effort. The joiner is excluded from its own
    /// `user_entered` announcement.
    pub async fn handle_join_stall(
        &self,
        connection_id: &ConnectionId,
        stall_id: StallId,
        user_id: UserId,
        role: ParticipantRole,
    ) {
        self.registry
            .announce_stall_identity(connection_id, &stall_id, user_id.clone())
            .await;
        self.registry
            .join_stall_room(connection_id, stall_id.clone())
            .await;
        self.touched_stalls.write().await.insert(stall_id.clone());

        if let Err(e) = self.store.add_user(&stall_id, &user_id).await {
            tracing::warn!(
                stall_id = %stall_id,
                user_id = %user_id,
                "Failed to record presence, occupancy will be stale: {}",
                e
            );
        }

        let room = RoomId::Stall(stall_id.clone());
        self.registry
            .broadcast_except(
                &room,
                connection_id,
                ServerEvent::UserEntered {
                    user_id: user_id.clone(),
                    role,
                },
            )
            .await;

        // Replay the last known vendor status so the joiner does not have
        // to wait for the next live toggle.
        match self.store.vendor_online(&stall_id).await {
            Ok(flag) => {
                let status = VendorStatus::from_flag(flag);
                if status.is_online() {
                    self.registry
                        .send_to_connection(
                            connection_id,
                            ServerEvent::VendorPresence { stall_id, status },
                        )
                        .await;
                }
            }
            Err(e) => {
                tracing::warn!(
                    stall_id = %stall_id,
                    "Vendor status replay unavailable for new joiner: {}",
                    e
                );
            }
        }
    }

    /// Handle a `leave_stall` event.
    ///
    /// The registry leave is the load-bearing part; the store cleanup is
    /// best-effort and only possible when the connection announced a user.
    pub async fn handle_leave_stall(
        &self,
        connection_id: &ConnectionId,
        stall_id: &StallId,
        user_id: Option<&UserId>,
    ) {
        self.registry
            .leave_stall_room(connection_id, stall_id)
            .await;

        if let Some(user_id) = user_id {
            if let Err(e) = self.store.remove_user(stall_id, user_id).await {
                tracing::warn!(
                    stall_id = %stall_id,
                    user_id = %user_id,
                    "Failed to clear presence on leave, sweep will catch it: {}",
                    e
                );
            }
        }
    }

    /// Handle a `vendor_status_update` event.
    ///
    /// Persists the flag, then broadcasts to every current room member.
    /// Connections joining later get the stored flag as a replay instead.
    pub async fn handle_vendor_status_update(&self, stall_id: StallId, status: VendorStatus) {
        self.touched_stalls.write().await.insert(stall_id.clone());

        if let Err(e) = self
            .store
            .set_vendor_online(&stall_id, status.is_online())
            .await
        {
            tracing::warn!(
                stall_id = %stall_id,
                status = %status,
                "Failed to persist vendor status, replay will lag: {}",
                e
            );
        }

        let room = RoomId::Stall(stall_id.clone());
        self.registry
            .broadcast(&room, ServerEvent::VendorPresence { stall_id, status })
            .await;
    }

    /// One reconciliation pass over every stall seen since startup.
    ///
    /// Abrupt disconnects leave stale entries in the store's occupancy set
    /// because the disconnect path deliberately does no store I/O. The
    /// sweep is strictly instance-scoped: it renews the liveness of this
    /// instance's own occupancy partition, then removes entries from that
    /// partition with no live identified connection in the stall room.
    /// Other instances' partitions are never touched; a crashed instance's
    /// partition stops being renewed and expires on the store side, which
    /// also covers occupancy this process left behind before a restart.
    ///
    /// Stalls that are empty both in the room and in the own partition are
    /// dropped from the sweep set.
    pub async fn reconcile_once(&self) {
        let stalls: Vec<StallId> = self.touched_stalls.read().await.iter().cloned().collect();

        for stall_id in stalls {
            if let Err(e) = self.store.refresh_occupancy(&stall_id).await {
                tracing::debug!(stall_id = %stall_id, "Skipping sweep for stall: {}", e);
                continue;
            }

            let live = self
                .registry
                .users_in_room(&RoomId::Stall(stall_id.clone()))
                .await;

            let recorded = match self.store.own_users_in_stall(&stall_id).await {
                Ok(users) => users,
                Err(e) => {
                    tracing::debug!(stall_id = %stall_id, "Skipping sweep for stall: {}", e);
                    continue;
                }
            };

            let mut remaining = 0usize;
            for user_id in recorded {
                if live.contains(&user_id) {
                    remaining += 1;
                    continue;
                }
                if let Err(e) = self.store.remove_user(&stall_id, &user_id).await {
                    remaining += 1;
                    tracing::debug!(
                        stall_id = %stall_id,
                        user_id = %user_id,
                        "Sweep failed to remove stale presence: {}",
                        e
                    );
                } else {
                    tracing::debug!(
                        stall_id = %stall_id,
                        user_id = %user_id,
                        "Removed stale presence entry"
                    );
                }
            }

            if live.is_empty() && remaining == 0 {
                self.touched_stalls.write().await.remove(&stall_id);
            }
        }
    }

    /// Spawn the periodic reconciliation sweep.
    pub fn spawn_reconciliation(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick fires immediately; skip it so a fresh process
            // doesn't sweep before any traffic.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                self.reconcile_once().await;
            }
        })
    }
}
