//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! - `PresenceStore` - durable stall occupancy and vendor-online flags
//! - `MessageRepository` - direct message persistence

mod message_repository;
mod presence_store;

pub use message_repository::MessageRepository;
pub use presence_store::{PresenceStore, PresenceStoreError};
