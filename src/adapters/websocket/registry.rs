//! Connection registry and room broadcaster.
//!
//! Tracks live transport connections, their client-asserted identity, and
//! their room memberships, and fans events out to rooms. Rooms exist
//! implicitly while at least one connection is joined:
//!
//! ```text
//! Room: private:user-a     Room: stall:42
//! ├── conn-1 (laptop)      ├── conn-1 (user-a browsing)
//! └── conn-2 (phone)       └── conn-3 (vendor)
//! ```
//!
//! One registry instance per process, constructed at startup and injected
//! into the transport and REST layers. Both maps live behind a single
//! `RwLock` so a connection's `joined_rooms` always mirrors the room index.
//!
//! Every operation is total: referencing a connection that already
//! disconnected is a silent no-op, and delivery to a closed channel is
//! skipped without aborting the rest of a broadcast.

use std::collections::{HashMap, HashSet};
use std::fmt;

use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use crate::domain::foundation::{StallId, UserId};

use super::events::ServerEvent;

/// Unique identifier for a transport connection, assigned at connect time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Create a new random connection ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A named broadcast group.
///
/// The two room kinds are an exhaustive enum rather than formatted strings,
/// so a private room can never collide with a stall room.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RoomId {
    /// One per user; all of that user's active connections join it.
    Private(UserId),
    /// One per stall; everyone currently viewing the stall joins it.
    Stall(StallId),
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoomId::Private(user) => write!(f, "private:{}", user),
            RoomId::Stall(stall) => write!(f, "stall:{}", stall),
        }
    }
}

/// Per-connection bookkeeping.
struct ConnectionState {
    /// Identity bound to the private room, set by `join_private_room`.
    user_id: Option<UserId>,
    /// Identity the connection asserted per stall; latest assertion wins.
    /// Kept separately from `user_id` because the wire protocol allows a
    /// stall join under a different user id than the private-room binding.
    stall_identities: HashMap<StallId, UserId>,
    /// Rooms this connection currently belongs to.
    joined_rooms: HashSet<RoomId>,
    /// Outbound delivery channel; the socket task drains the other end.
    tx: mpsc::UnboundedSender<ServerEvent>,
}

#[derive(Default)]
struct RegistryInner {
    connections: HashMap<ConnectionId, ConnectionState>,
    rooms: HashMap<RoomId, HashSet<ConnectionId>>,
}

impl RegistryInner {
    fn join(&mut self, connection_id: ConnectionId, room: RoomId) {
        if let Some(state) = self.connections.get_mut(&connection_id) {
            state.joined_rooms.insert(room.clone());
            self.rooms.entry(room).or_default().insert(connection_id);
        }
    }

    fn leave(&mut self, connection_id: ConnectionId, room: &RoomId) {
        if let Some(state) = self.connections.get_mut(&connection_id) {
            state.joined_rooms.remove(room);
            if let RoomId::Stall(stall_id) = room {
                state.stall_identities.remove(stall_id);
            }
        }
        if let Some(members) = self.rooms.get_mut(room) {
            members.remove(&connection_id);
            if members.is_empty() {
                self.rooms.remove(room);
            }
        }
    }
}

/// Tracks live connections and fans events out to rooms.
///
/// # Thread Safety
///
/// A single `RwLock` guards both the connection map and the room index;
/// broadcasts take a read lock, joins/leaves a write lock.
pub struct ConnectionRegistry {
    inner: RwLock<RegistryInner>,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(RegistryInner::default()),
        }
    }

    /// Allocate state for a new transport session.
    ///
    /// Returns the connection id and the receiver the socket task drains to
    /// deliver events in issue order (transport-level FIFO per connection).
    pub async fn connect(&self) -> (ConnectionId, mpsc::UnboundedReceiver<ServerEvent>) {
        let connection_id = ConnectionId::new();
        let (tx, rx) = mpsc::unbounded_channel();

        let mut inner = self.inner.write().await;
        inner.connections.insert(
            connection_id,
            ConnectionState {
                user_id: None,
                stall_identities: HashMap::new(),
                joined_rooms: HashSet::new(),
                tx,
            },
        );

        (connection_id, rx)
    }

    /// Remove the connection from every room it was joined to.
    ///
    /// Idempotent; a second call is a no-op. Does not touch the presence
    /// store (staleness there is reconciled separately).
    pub async fn disconnect(&self, connection_id: &ConnectionId) {
        let mut inner = self.inner.write().await;
        let Some(state) = inner.connections.remove(connection_id) else {
            return;
        };
        for room in state.joined_rooms {
            if let Some(members) = inner.rooms.get_mut(&room) {
                members.remove(connection_id);
                if members.is_empty() {
                    inner.rooms.remove(&room);
                }
            }
        }
    }

    /// Bind the connection to the user's private room.
    ///
    /// A later call with a different user re-binds (leaves the old private
    /// room) rather than erroring: reconnect-with-different-identity in a
    /// shared browser session is allowed because no server-side auth is
    /// enforced on this channel.
    pub async fn join_private_room(&self, connection_id: &ConnectionId, user_id: UserId) {
        let mut inner = self.inner.write().await;
        let Some(state) = inner.connections.get_mut(connection_id) else {
            return;
        };

        let previous = state.user_id.replace(user_id.clone());
        if let Some(previous) = previous {
            if previous != user_id {
                inner.leave(*connection_id, &RoomId::Private(previous));
            }
        }
        inner.join(*connection_id, RoomId::Private(user_id));
    }

    /// Record the identity a connection asserted for one stall.
    ///
    /// Used by stall joins so occupancy reconciliation can attribute the
    /// connection to the user it announced for that stall. A later
    /// assertion for the same stall overwrites the earlier one; the
    /// private-room binding is untouched.
    pub async fn announce_stall_identity(
        &self,
        connection_id: &ConnectionId,
        stall_id: &StallId,
        user_id: UserId,
    ) {
        let mut inner = self.inner.write().await;
        if let Some(state) = inner.connections.get_mut(connection_id) {
            state.stall_identities.insert(stall_id.clone(), user_id);
        }
    }

    /// Add the connection to a stall room. Already joined is a no-op.
    pub async fn join_stall_room(&self, connection_id: &ConnectionId, stall_id: StallId) {
        let mut inner = self.inner.write().await;
        inner.join(*connection_id, RoomId::Stall(stall_id));
    }

    /// Remove the connection from a stall room. Not joined is a no-op.
    pub async fn leave_stall_room(&self, connection_id: &ConnectionId, stall_id: &StallId) {
        let mut inner = self.inner.write().await;
        inner.leave(*connection_id, &RoomId::Stall(stall_id.clone()));
    }

    /// Deliver an event to every connection currently in the room.
    ///
    /// Delivery reflects membership at the instant of the call; closed
    /// channels are skipped silently.
    pub async fn broadcast(&self, room: &RoomId, event: ServerEvent) {
        self.fan_out(room, None, event).await;
    }

    /// Broadcast to a room, excluding one connection (the sender).
    ///
    /// Sender-exclusion is required for `user_entered`: the joining
    /// connection must not see itself announced.
    pub async fn broadcast_except(
        &self,
        room: &RoomId,
        excluded: &ConnectionId,
        event: ServerEvent,
    ) {
        self.fan_out(room, Some(excluded), event).await;
    }

    /// Deliver an event to every active connection bound to the user.
    ///
    /// Semantically identical to broadcasting to the private room; if the
    /// user has no live connection the event is simply dropped (the
    /// persisted record remains retrievable over REST).
    pub async fn send_to_user(&self, user_id: &UserId, event: ServerEvent) {
        self.broadcast(&RoomId::Private(user_id.clone()), event)
            .await;
    }

    /// Unicast an event to a single connection.
    pub async fn send_to_connection(&self, connection_id: &ConnectionId, event: ServerEvent) {
        let inner = self.inner.read().await;
        if let Some(state) = inner.connections.get(connection_id) {
            let _ = state.tx.send(event);
        }
    }

    /// User ids announced by connections currently in the room.
    ///
    /// For stall rooms this reports the identity each member asserted for
    /// that stall, which is what the occupancy reconciliation sweep needs;
    /// a member that never announced one is not represented. For private
    /// rooms it reports the bound identity.
    pub async fn users_in_room(&self, room: &RoomId) -> HashSet<UserId> {
        let inner = self.inner.read().await;
        let Some(members) = inner.rooms.get(room) else {
            return HashSet::new();
        };
        members
            .iter()
            .filter_map(|id| inner.connections.get(id))
            .filter_map(|state| match room {
                RoomId::Stall(stall_id) => state.stall_identities.get(stall_id).cloned(),
                RoomId::Private(_) => state.user_id.clone(),
            })
            .collect()
    }

    /// Number of connections currently joined to the room.
    pub async fn room_size(&self, room: &RoomId) -> usize {
        let inner = self.inner.read().await;
        inner.rooms.get(room).map(|m| m.len()).unwrap_or(0)
    }

    /// Total number of live connections (for monitoring/debugging).
    pub async fn connection_count(&self) -> usize {
        self.inner.read().await.connections.len()
    }

    async fn fan_out(&self, room: &RoomId, excluded: Option<&ConnectionId>, event: ServerEvent) {
        let inner = self.inner.read().await;
        let Some(members) = inner.rooms.get(room) else {
            return;
        };
        for connection_id in members {
            if excluded == Some(connection_id) {
                continue;
            }
            if let Some(state) = inner.connections.get(connection_id) {
                // Send failure means the socket task is gone; the
                // disconnect event will reap the entry.
                let _ = state.tx.send(event.clone());
            }
        }
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
