//! In-memory message repository for tests and local development.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, UserId};
use crate::domain::messaging::Message;
use crate::ports::MessageRepository;

/// In-memory implementation of MessageRepository.
#[derive(Default)]
pub struct InMemoryMessageRepository {
    messages: RwLock<Vec<Message>>,
}

impl InMemoryMessageRepository {
    /// Creates an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored messages (test helper).
    pub async fn len(&self) -> usize {
        self.messages.read().await.len()
    }

    /// True when no messages are stored.
    pub async fn is_empty(&self) -> bool {
        self.messages.read().await.is_empty()
    }
}

#[async_trait]
impl MessageRepository for InMemoryMessageRepository {
    async fn create(&self, message: &Message) -> Result<(), DomainError> {
        self.messages.write().await.push(message.clone());
        Ok(())
    }

    async fn history_for(&self, user_id: &UserId) -> Result<Vec<Message>, DomainError> {
        let messages = self.messages.read().await;
        let mut history: Vec<Message> = messages
            .iter()
            .filter(|m| &m.sender_id == user_id || &m.receiver_id == user_id)
            .cloned()
            .collect();
        history.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    #[tokio::test]
    async fn history_includes_sent_and_received_newest_first() {
        let repo = InMemoryMessageRepository::new();
        let first = Message::new(user("a"), user("b"), "first").unwrap();
        let second = Message::new(user("b"), user("a"), "second").unwrap();
        let unrelated = Message::new(user("c"), user("d"), "other").unwrap();

        repo.create(&first).await.unwrap();
        repo.create(&second).await.unwrap();
        repo.create(&unrelated).await.unwrap();

        let history = repo.history_for(&user("a")).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].content, "second");
        assert_eq!(history[1].content, "first");
    }

    #[tokio::test]
    async fn history_for_unknown_user_is_empty() {
        let repo = InMemoryMessageRepository::new();
        assert!(repo.history_for(&user("nobody")).await.unwrap().is_empty());
    }
}
