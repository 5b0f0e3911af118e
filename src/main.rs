//! Marketverse backend entrypoint.
//!
//! Wires the realtime layer (connection registry, presence coordinator,
//! delivery bridge) and the REST boundary onto a single axum server.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use marketverse::adapters::http::messages::{message_router, MessageAppState};
use marketverse::adapters::messaging::PostgresMessageRepository;
use marketverse::adapters::presence::RedisPresenceStore;
use marketverse::adapters::websocket::{
    websocket_router, ConnectionRegistry, MessageDeliveryBridge, PresenceCoordinator,
    WebSocketState,
};
use marketverse::config::AppConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.server.log_level))
        .init();

    tracing::info!("Starting marketverse backend");

    // Message persistence.
    let pool = PgPoolOptions::new()
        .min_connections(config.database.min_connections)
        .max_connections(config.database.max_connections)
        .acquire_timeout(config.database.acquire_timeout())
        .connect(&config.database.url)
        .await?;

    if config.database.run_migrations {
        tracing::info!("Running database migrations");
        sqlx::migrate!("./migrations").run(&pool).await?;
    }

    // Durable presence store.
    let redis_client = redis::Client::open(config.redis.url.as_str())?;
    let redis_conn = redis_client.get_multiplexed_tokio_connection().await?;
    let presence_store = Arc::new(
        RedisPresenceStore::new(redis_conn)
            .with_op_timeout(config.websocket.presence_op_timeout())
            .with_occupancy_ttl(config.websocket.presence_ttl()),
    );

    // Realtime core.
    let registry = Arc::new(ConnectionRegistry::new());
    let coordinator = Arc::new(PresenceCoordinator::new(
        registry.clone(),
        presence_store,
    ));
    let delivery = Arc::new(MessageDeliveryBridge::new(registry.clone()));

    // Periodic sweep for connections that dropped without a leave.
    let _sweep = coordinator
        .clone()
        .spawn_reconciliation(config.websocket.reconcile_interval());

    let repository = Arc::new(PostgresMessageRepository::new(pool));
    let message_state = MessageAppState::new(repository, delivery);
    let ws_state = WebSocketState::new(registry, coordinator);

    let cors = build_cors(&config);

    let app = Router::new()
        .merge(websocket_router().with_state(ws_state))
        .merge(
            message_router()
                .with_state(message_state)
                // REST-only: the socket route must not inherit the timeout.
                .layer(TimeoutLayer::new(Duration::from_secs(
                    config.server.request_timeout_secs,
                ))),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let address = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(address).await?;
    tracing::info!("Server running on {}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shut down");
    Ok(())
}

fn build_cors(config: &AppConfig) -> CorsLayer {
    let origins = config.server.cors_origins_list();
    if origins.is_empty() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let parsed: Vec<_> = origins
        .iter()
        .filter_map(|o| o.parse::<http::HeaderValue>().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(parsed)
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Received Ctrl+C, shutting down");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                tracing::info!("Received terminate signal, shutting down");
            }
            Err(e) => tracing::error!("Failed to install signal handler: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
