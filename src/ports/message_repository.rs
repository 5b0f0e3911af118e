//! MessageRepository port - persistence collaborator for direct messages.
//!
//! The realtime layer never writes messages itself; the REST handler
//! persists through this port and only afterwards hands the created record
//! to the delivery bridge. History reads stay authoritative when the
//! realtime push is missed.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, UserId};
use crate::domain::messaging::Message;

/// Port for message persistence.
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Persists a new message record.
    ///
    /// The returned future resolves only once the write is acknowledged;
    /// callers rely on this for the push-after-durability ordering.
    async fn create(&self, message: &Message) -> Result<(), DomainError>;

    /// Returns every message the user sent or received, newest first.
    async fn history_for(&self, user_id: &UserId) -> Result<Vec<Message>, DomainError>;
}
