//! HTTP DTOs for message endpoints.

use serde::{Deserialize, Serialize};

use crate::domain::messaging::Message;

/// Request body for sending a direct message.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub sender_id: String,
    pub receiver_id: String,
    pub content: String,
}

/// View of a persisted message for API responses.
///
/// Matches the `new_message` realtime payload field for field so a client
/// can treat both interchangeably.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    pub id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub content: String,
    pub created_at: String,
}

impl From<&Message> for MessageView {
    fn from(message: &Message) -> Self {
        Self {
            id: message.id.to_string(),
            sender_id: message.sender_id.to_string(),
            receiver_id: message.receiver_id.to_string(),
            content: message.content.clone(),
            created_at: message.created_at.to_rfc3339(),
        }
    }
}

/// Standard error payload for message endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            code: "BAD_REQUEST".to_string(),
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            code: "INTERNAL_ERROR".to_string(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::UserId;

    #[test]
    fn message_view_mirrors_realtime_payload_shape() {
        let msg = Message::new(
            UserId::new("buyer-1").unwrap(),
            UserId::new("vendor-1").unwrap(),
            "hello",
        )
        .unwrap();

        let view = MessageView::from(&msg);
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["senderId"], "buyer-1");
        assert_eq!(json["receiverId"], "vendor-1");
        assert_eq!(json["content"], "hello");
        assert!(json["createdAt"].as_str().unwrap().contains('T'));
    }

    #[test]
    fn send_request_deserializes_camel_case() {
        let req: SendMessageRequest = serde_json::from_str(
            r#"{"senderId":"a","receiverId":"b","content":"hi"}"#,
        )
        .unwrap();
        assert_eq!(req.sender_id, "a");
        assert_eq!(req.receiver_id, "b");
    }
}
