//! Message delivery bridge between the REST layer and connected clients.
//!
//! Invoked exactly once per successfully persisted message, strictly after
//! the persistence write is acknowledged: a client that re-fetches history
//! on receiving the push must observe the record. Delivery itself is an
//! at-most-once, best-effort hint; if the receiver has no live connection
//! the event is dropped and the history endpoint stays authoritative.

use std::sync::Arc;

use crate::domain::foundation::UserId;
use crate::domain::messaging::Message;

use super::events::ServerEvent;
use super::registry::ConnectionRegistry;

/// Pushes newly persisted messages to the receiver's private room.
pub struct MessageDeliveryBridge {
    registry: Arc<ConnectionRegistry>,
}

impl MessageDeliveryBridge {
    /// Create a new bridge over the given registry.
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// Push the created record to every active connection of the receiver.
    ///
    /// The sender gets nothing on this channel; the REST response already
    /// returned the record to it. No retry, no acknowledgment.
    pub async fn notify_new_message(&self, receiver_id: &UserId, message: Message) {
        tracing::debug!(
            receiver_id = %receiver_id,
            message_id = %message.id,
            "Pushing new message to private room"
        );
        self.registry
            .send_to_user(receiver_id, ServerEvent::NewMessage(message))
            .await;
    }
}
