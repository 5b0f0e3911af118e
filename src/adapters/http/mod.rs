//! HTTP adapters (REST boundary).

pub mod messages;
