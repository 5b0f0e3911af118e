//! PostgreSQL implementation of MessageRepository.

use async_trait::async_trait;
use sqlx::{PgPool, Row};

use crate::domain::foundation::{DomainError, ErrorCode, MessageId, Timestamp, UserId};
use crate::domain::messaging::Message;
use crate::ports::MessageRepository;

/// PostgreSQL implementation of MessageRepository.
#[derive(Clone)]
pub struct PostgresMessageRepository {
    pool: PgPool,
}

impl PostgresMessageRepository {
    /// Creates a new PostgresMessageRepository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageRepository for PostgresMessageRepository {
    async fn create(&self, message: &Message) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO messages (id, sender_id, receiver_id, content, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(message.id.as_uuid())
        .bind(message.sender_id.as_str())
        .bind(message.receiver_id.as_str())
        .bind(&message.content)
        .bind(message.created_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to insert message: {}", e),
            )
        })?;

        Ok(())
    }

    async fn history_for(&self, user_id: &UserId) -> Result<Vec<Message>, DomainError> {
        let rows = sqlx::query(
            r#"
            SELECT id, sender_id, receiver_id, content, created_at
            FROM messages
            WHERE sender_id = $1 OR receiver_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to fetch message history: {}", e),
            )
        })?;

        rows.into_iter().map(row_to_message).collect()
    }
}

fn row_to_message(row: sqlx::postgres::PgRow) -> Result<Message, DomainError> {
    let id: uuid::Uuid = row.try_get("id").map_err(db_error)?;
    let sender_id: String = row.try_get("sender_id").map_err(db_error)?;
    let receiver_id: String = row.try_get("receiver_id").map_err(db_error)?;
    let content: String = row.try_get("content").map_err(db_error)?;
    let created_at: chrono::DateTime<chrono::Utc> = row.try_get("created_at").map_err(db_error)?;

    Ok(Message::from_parts(
        MessageId::from_uuid(id),
        UserId::new(sender_id)?,
        UserId::new(receiver_id)?,
        content,
        Timestamp::from_datetime(created_at),
    ))
}

fn db_error(e: sqlx::Error) -> DomainError {
    DomainError::new(
        ErrorCode::DatabaseError,
        format!("Failed to read message row: {}", e),
    )
}
