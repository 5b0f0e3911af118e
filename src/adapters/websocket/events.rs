//! Realtime event protocol between server and connected clients.
//!
//! Every inbound and outbound event is an exhaustive tagged enum carrying a
//! typed payload, dispatched through a single `match`. The `type` tag uses
//! snake_case event names; payload fields are camelCase to match the REST
//! records the frontend already consumes.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{StallId, UserId};
use crate::domain::messaging::Message;
use crate::domain::presence::{ParticipantRole, VendorStatus};

// ============================================
// Client → Server Events
// ============================================

/// All event types that can be received from a client.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Bind this connection to the user's private room.
    ///
    /// Identity is client-asserted; see the known-gap note on the handler.
    #[serde(rename_all = "camelCase")]
    JoinUser { user_id: UserId },

    /// Enter a stall's presence room.
    #[serde(rename_all = "camelCase")]
    JoinStall {
        stall_id: StallId,
        user_id: UserId,
        role: ParticipantRole,
    },

    /// Exit a stall's presence room.
    #[serde(rename_all = "camelCase")]
    LeaveStall { stall_id: StallId },

    /// Vendor toggles its own visibility for a stall.
    #[serde(rename_all = "camelCase")]
    VendorStatusUpdate {
        stall_id: StallId,
        status: VendorStatus,
    },
}

// ============================================
// Server → Client Events
// ============================================

/// All event types that can be sent to a client.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Connection registered successfully.
    #[serde(rename_all = "camelCase")]
    Connected {
        connection_id: String,
        timestamp: String,
    },

    /// Someone else entered a stall the client is viewing.
    ///
    /// Broadcast to the stall room, excluding the joiner itself.
    #[serde(rename_all = "camelCase")]
    UserEntered {
        user_id: UserId,
        role: ParticipantRole,
    },

    /// Vendor visibility changed (broadcast), or replay of the last known
    /// status unicast to a freshly joined connection.
    #[serde(rename_all = "camelCase")]
    VendorPresence {
        stall_id: StallId,
        status: VendorStatus,
    },

    /// A direct message was persisted for this user; the payload is the
    /// created record, identical to what the history endpoint returns.
    NewMessage(Message),

    /// Protocol-level error (e.g. unparseable frame). Never fatal.
    Error { code: String, message: String },
}
