//! Presence store adapters.
//!
//! `RedisPresenceStore` is the production implementation (shared across
//! server instances); `InMemoryPresenceStore` backs tests and local
//! development.

mod in_memory;
mod redis_store;

pub use in_memory::InMemoryPresenceStore;
pub use redis_store::RedisPresenceStore;
