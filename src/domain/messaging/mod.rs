//! Direct messaging entities.
//!
//! Messages are persisted by the REST layer; the realtime layer only
//! forwards a copy of the created record to the receiver's private room.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{MessageId, Timestamp, UserId, ValidationError};

/// A persisted user-to-user direct message.
///
/// Serialized camelCase because the record travels verbatim over both the
/// REST response and the `new_message` realtime event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub content: String,
    pub created_at: Timestamp,
}

impl Message {
    /// Creates a new message with a fresh id and the current timestamp.
    pub fn new(
        sender_id: UserId,
        receiver_id: UserId,
        content: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let content = content.into();
        if content.trim().is_empty() {
            return Err(ValidationError::empty_field("content"));
        }
        Ok(Self {
            id: MessageId::new(),
            sender_id,
            receiver_id,
            content,
            created_at: Timestamp::now(),
        })
    }

    /// Rehydrates a message from storage.
    pub fn from_parts(
        id: MessageId,
        sender_id: UserId,
        receiver_id: UserId,
        content: String,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            sender_id,
            receiver_id,
            content,
            created_at,
        }
    }
}
