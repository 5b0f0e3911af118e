//! Axum routes for message endpoints.
//!
//! - POST /api/messages - Send a direct message
//! - GET /api/messages/{user_id} - Message history for a user

use axum::routing::{get, post};
use axum::Router;

use super::handlers::{get_history, send_message, MessageAppState};

/// Creates routes for message endpoints.
pub fn message_routes() -> Router<MessageAppState> {
    Router::new()
        .route("/messages", post(send_message))
        .route("/messages/{user_id}", get(get_history))
}

/// Combined router with all message routes under /api.
pub fn message_router() -> Router<MessageAppState> {
    Router::new().nest("/api", message_routes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_routes_creates_valid_router() {
        let _routes = message_routes();
    }

    #[test]
    fn message_router_creates_combined_router() {
        let _router = message_router();
    }
}
