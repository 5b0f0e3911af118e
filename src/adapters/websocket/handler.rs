//! WebSocket upgrade handler for the realtime channel.
//!
//! Connection lifecycle:
//! 1. Upgrade to WebSocket and register with the connection registry
//! 2. Unicast the `connected` acknowledgment
//! 3. Forward registry events to the socket until either side closes
//! 4. Dispatch inbound events through a single match
//! 5. Disconnect from the registry (releases every room membership)
//!
//! # Security
//!
//! Identity on this channel is client-asserted: `join_user` carries no
//! verifiable token. A hardened deployment would validate the private-room
//! join against the same session mechanism as REST; the current behavior is
//! a known gap, not a feature.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use crate::domain::foundation::{StallId, Timestamp, UserId};

use super::{
    events::{ClientEvent, ServerEvent},
    presence::PresenceCoordinator,
    registry::{ConnectionId, ConnectionRegistry},
};

/// State required for WebSocket handling, extracted from app state.
#[derive(Clone)]
pub struct WebSocketState {
    pub registry: Arc<ConnectionRegistry>,
    pub presence: Arc<PresenceCoordinator>,
}

impl WebSocketState {
    /// Create a new WebSocket state.
    pub fn new(registry: Arc<ConnectionRegistry>, presence: Arc<PresenceCoordinator>) -> Self {
        Self { registry, presence }
    }
}

/// Handle WebSocket upgrade requests.
///
/// Route: `GET /ws`
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<WebSocketState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle an established WebSocket connection for its whole lifetime.
async fn handle_socket(socket: WebSocket, state: WebSocketState) {
    let (sender, mut receiver) = socket.split();

    let (connection_id, registry_rx) = state.registry.connect().await;
    tracing::debug!(connection_id = %connection_id, "Client connected");

    state
        .registry
        .send_to_connection(
            &connection_id,
            ServerEvent::Connected {
                connection_id: connection_id.to_string(),
                timestamp: Timestamp::now().to_rfc3339(),
            },
        )
        .await;

    // Forward registry events to the client in issue order.
    let forward_task = tokio::spawn(forward_events(registry_rx, connection_id, sender));

    // The user id this socket announced per stall, so an explicit leave can
    // clear the durable occupancy entry.
    let mut stall_users: HashMap<StallId, UserId> = HashMap::new();

    while let Some(result) = receiver.next().await {
        match result {
            Ok(Message::Text(text)) => {
                match serde_json::from_str::<ClientEvent>(&text) {
                    Ok(event) => {
                        dispatch(&state, &connection_id, &mut stall_users, event).await;
                    }
                    Err(e) => {
                        tracing::warn!(
                            connection_id = %connection_id,
                            "Unparseable client event: {}",
                            e
                        );
                        state
                            .registry
                            .send_to_connection(
                                &connection_id,
                                ServerEvent::Error {
                                    code: "BAD_EVENT".to_string(),
                                    message: "Event could not be parsed".to_string(),
                                },
                            )
                            .await;
                    }
                }
            }
            Ok(Message::Binary(_)) => {
                tracing::warn!(
                    connection_id = %connection_id,
                    "Received unsupported binary message"
                );
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {
                // Protocol-level frames, handled by axum.
            }
            Ok(Message::Close(_)) => {
                tracing::debug!(connection_id = %connection_id, "Client sent close frame");
                break;
            }
            Err(e) => {
                tracing::debug!(connection_id = %connection_id, "Receive error: {}", e);
                break;
            }
        }
    }

    forward_task.abort();
    state.registry.disconnect(&connection_id).await;
    tracing::debug!(connection_id = %connection_id, "Client disconnected");
}

/// Route one inbound event to the matching service call.
async fn dispatch(
    state: &WebSocketState,
    connection_id: &ConnectionId,
    stall_users: &mut HashMap<StallId, UserId>,
    event: ClientEvent,
) {
    match event {
        ClientEvent::JoinUser { user_id } => {
            state
                .registry
                .join_private_room(connection_id, user_id)
                .await;
        }
        ClientEvent::JoinStall {
            stall_id,
            user_id,
            role,
        } => {
            stall_users.insert(stall_id.clone(), user_id.clone());
            state
                .presence
                .handle_join_stall(connection_id, stall_id, user_id, role)
                .await;
        }
        ClientEvent::LeaveStall { stall_id } => {
            let user_id = stall_users.remove(&stall_id);
            state
                .presence
                .handle_leave_stall(connection_id, &stall_id, user_id.as_ref())
                .await;
        }
        ClientEvent::VendorStatusUpdate { stall_id, status } => {
            state
                .presence
                .handle_vendor_status_update(stall_id, status)
                .await;
        }
    }
}

/// Drain the registry channel into the socket sink.
///
/// A send failure means the transport is broken; stop forwarding and let
/// the receive loop observe the close.
async fn forward_events(
    mut rx: mpsc::UnboundedReceiver<ServerEvent>,
    connection_id: ConnectionId,
    mut sender: futures::stream::SplitSink<WebSocket, Message>,
) {
    while let Some(event) = rx.recv().await {
        let json = match serde_json::to_string(&event) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(connection_id = %connection_id, "Event serialization failed: {}", e);
                continue;
            }
        };
        if let Err(e) = sender.send(Message::Text(json.into())).await {
            tracing::debug!(
                connection_id = %connection_id,
                "Send error, closing forwarder: {}",
                e
            );
            break;
        }
    }
}

/// Create the axum router for the realtime endpoint.
pub fn websocket_router() -> axum::Router<WebSocketState> {
    use axum::routing::get;

    axum::Router::new().route("/ws", get(ws_handler))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::presence::InMemoryPresenceStore;
    use crate::domain::presence::{ParticipantRole, VendorStatus};

    fn user(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    fn stall(id: &str) -> StallId {
        StallId::new(id).unwrap()
    }

    fn test_state() -> WebSocketState {
        let registry = Arc::new(ConnectionRegistry::new());
        let store = Arc::new(InMemoryPresenceStore::new());
        let presence = Arc::new(PresenceCoordinator::new(registry.clone(), store));
        WebSocketState::new(registry, presence)
    }

    #[test]
    fn websocket_router_creates_route() {
        let _router = websocket_router();
    }

    #[tokio::test]
    async fn dispatch_join_user_binds_private_room() {
        let state = test_state();
        let (conn, mut rx) = state.registry.connect().await;
        let mut stalls = HashMap::new();

        dispatch(
            &state,
            &conn,
            &mut stalls,
            ClientEvent::JoinUser { user_id: user("u-1") },
        )
        .await;

        state
            .registry
            .send_to_user(&user("u-1"), ServerEvent::Error {
                code: "TEST".into(),
                message: "delivery check".into(),
            })
            .await;
        assert!(rx.recv().await.is_some());
    }

    #[tokio::test]
    async fn dispatch_leave_stall_uses_announced_identity() {
        let state = test_state();
        let (conn, mut rx) = state.registry.connect().await;
        let mut stalls = HashMap::new();

        dispatch(
            &state,
            &conn,
            &mut stalls,
            ClientEvent::JoinStall {
                stall_id: stall("s-1"),
                user_id: user("u-1"),
                role: ParticipantRole::Buyer,
            },
        )
        .await;
        assert!(stalls.contains_key(&stall("s-1")));

        dispatch(
            &state,
            &conn,
            &mut stalls,
            ClientEvent::LeaveStall { stall_id: stall("s-1") },
        )
        .await;
        assert!(stalls.is_empty());

        // No longer a member: stall broadcasts do not arrive.
        state
            .presence
            .handle_vendor_status_update(stall("s-1"), VendorStatus::Online)
            .await;
        assert!(rx.try_recv().is_err());
    }
}
