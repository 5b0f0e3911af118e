//! Domain layer - entities and value objects, no I/O.

pub mod foundation;
pub mod messaging;
pub mod presence;
