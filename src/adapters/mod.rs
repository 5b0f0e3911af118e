//! Adapters connecting the domain to the outside world.
//!
//! - `websocket` - realtime channel: registry, presence, delivery
//! - `http` - REST boundary for message send/history
//! - `presence` - presence store implementations (Redis, in-memory)
//! - `messaging` - message persistence (Postgres, in-memory)

pub mod http;
pub mod messaging;
pub mod presence;
pub mod websocket;
