//! Message persistence adapters.

mod in_memory;
mod postgres_repository;

pub use in_memory::InMemoryMessageRepository;
pub use postgres_repository::PostgresMessageRepository;
