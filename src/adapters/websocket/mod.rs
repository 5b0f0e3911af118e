//! Realtime presence and messaging layer.
//!
//! This is the core of the backend: everything else is thin REST plumbing
//! over collaborators. The pieces, in dependency order:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    ConnectionRegistry                        │
//! │  live connections, identities, room membership, fan-out      │
//! │  Room: private:user-a      Room: stall:42                    │
//! │  ├── conn-1                ├── conn-1                        │
//! │  └── conn-2                └── conn-3                        │
//! └──────────────────────────────────────────────────────────────┘
//!            ▲                              ▲
//!            │ send_to_user                 │ join/broadcast
//! ┌──────────┴──────────┐       ┌───────────┴──────────────┐
//! │ MessageDeliveryBridge│      │   PresenceCoordinator    │
//! │  REST → private room │      │  stall rooms + Redis     │
//! └─────────────────────┘       │  presence store          │
//!                               └──────────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`events`] - typed client/server event protocol
//! - [`registry`] - connection registry and room broadcaster
//! - [`presence`] - stall presence choreography and reconciliation sweep
//! - [`delivery`] - post-commit message push
//! - [`handler`] - axum WebSocket upgrade handler

pub mod delivery;
pub mod events;
pub mod handler;
pub mod presence;
pub mod registry;

pub use delivery::MessageDeliveryBridge;
pub use events::{ClientEvent, ServerEvent};
pub use handler::{websocket_router, ws_handler, WebSocketState};
pub use presence::PresenceCoordinator;
pub use registry::{ConnectionId, ConnectionRegistry, RoomId};
