//! HTTP adapter for direct messaging.

pub mod dto;
pub mod handlers;
pub mod routes;

pub use handlers::MessageAppState;
pub use routes::{message_router, message_routes};
