//! HTTP handlers for message endpoints.
//!
//! The send handler persists first and only then hands the record to the
//! delivery bridge; a receiver that re-fetches history on the push must
//! observe the new row.

use std::sync::Arc;

use axum::extract::{Json, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::adapters::websocket::MessageDeliveryBridge;
use crate::domain::foundation::UserId;
use crate::domain::messaging::Message;
use crate::ports::MessageRepository;

use super::dto::{ErrorResponse, MessageView, SendMessageRequest};

/// Shared application state for message handlers.
#[derive(Clone)]
pub struct MessageAppState {
    pub repository: Arc<dyn MessageRepository>,
    pub delivery: Arc<MessageDeliveryBridge>,
}

impl MessageAppState {
    /// Creates a new MessageAppState.
    pub fn new(
        repository: Arc<dyn MessageRepository>,
        delivery: Arc<MessageDeliveryBridge>,
    ) -> Self {
        Self {
            repository,
            delivery,
        }
    }
}

/// POST /api/messages - Persist a direct message and push it to the receiver.
///
/// Identity is client-asserted; authentication is enforced upstream, not here.
///
/// # Errors
/// - 400 Bad Request: empty ids or blank content
/// - 500 Internal Server Error: persistence failure
pub async fn send_message(
    State(state): State<MessageAppState>,
    Json(request): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, MessageApiError> {
    let sender_id = UserId::new(request.sender_id)
        .map_err(|_| MessageApiError::BadRequest("senderId must be non-empty".to_string()))?;
    let receiver_id = UserId::new(request.receiver_id)
        .map_err(|_| MessageApiError::BadRequest("receiverId must be non-empty".to_string()))?;

    let message = Message::new(sender_id, receiver_id.clone(), request.content)
        .map_err(|_| MessageApiError::BadRequest("content must be non-blank".to_string()))?;

    state
        .repository
        .create(&message)
        .await
        .map_err(|e| MessageApiError::Internal(e.to_string()))?;

    // Persisted and acknowledged; the push may now race a history re-fetch
    // but never precede the row.
    state
        .delivery
        .notify_new_message(&receiver_id, message.clone())
        .await;

    Ok((StatusCode::CREATED, Json(MessageView::from(&message))))
}

/// GET /api/messages/{user_id} - Message history, sent or received, newest first.
pub async fn get_history(
    State(state): State<MessageAppState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, MessageApiError> {
    let user_id = UserId::new(user_id)
        .map_err(|_| MessageApiError::BadRequest("userId must be non-empty".to_string()))?;

    let history = state
        .repository
        .history_for(&user_id)
        .await
        .map_err(|e| MessageApiError::Internal(e.to_string()))?;

    let views: Vec<MessageView> = history.iter().map(MessageView::from).collect();
    Ok((StatusCode::OK, Json(views)))
}

/// Errors returned by message endpoints.
#[derive(Debug)]
pub enum MessageApiError {
    BadRequest(String),
    Internal(String),
}

impl IntoResponse for MessageApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, error) = match self {
            MessageApiError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, ErrorResponse::bad_request(msg))
            }
            MessageApiError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::internal("An internal error occurred"),
                )
            }
        };

        (status, Json(error)).into_response()
    }
}
