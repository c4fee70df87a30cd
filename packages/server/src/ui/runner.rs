//! Server startup and shutdown.

use std::{future::Future, sync::Arc};

use axum::{
    Router,
    http::{HeaderValue, Method},
    routing::get,
};
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    config::ServerConfig,
    domain::{Authenticator, SignalingRepository},
    error::ServerError,
    infrastructure::{auth::QueryAuthenticator, repository::InMemorySignalingRepository},
};

use super::{
    handler::{
        get_room_detail, get_rooms, health_check, room_websocket_handler, websocket_handler,
    },
    signal::shutdown_signal,
    state::AppState,
};

/// Bind the configured address and serve until Ctrl-C / SIGTERM.
pub async fn run(config: ServerConfig) -> Result<(), ServerError> {
    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: addr.clone(),
            source,
        })?;

    serve(listener, config, shutdown_signal()).await
}

/// Serve on an already bound listener until `shutdown` resolves.
///
/// On shutdown every outbound queue is closed, so each write pump sends a
/// close frame to its peer before the server returns.
pub async fn serve<F>(
    listener: TcpListener,
    config: ServerConfig,
    shutdown: F,
) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let repository: Arc<dyn SignalingRepository> = Arc::new(InMemorySignalingRepository::new());
    let authenticator: Arc<dyn Authenticator> =
        Arc::new(QueryAuthenticator::new(config.require_identity));
    let state = Arc::new(AppState::new(Arc::clone(&repository), authenticator, config));

    match listener.local_addr() {
        Ok(addr) => tracing::info!("Signaling server listening on {}", addr),
        Err(e) => tracing::warn!("Signaling server listening (address unknown: {})", e),
    }

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(async move {
            shutdown.await;
            tracing::info!("Shutting down signaling server");
            repository.shutdown().await;
        })
        .await
        .map_err(ServerError::Serve)?;

    tracing::info!("Signaling server stopped");
    Ok(())
}

/// Build the router with all routes and middleware.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.allowed_origins);

    Router::new()
        .route("/ws", get(websocket_handler))
        .route("/ws/{room_id}", get(room_websocket_handler))
        .route("/api/health", get(health_check))
        .route("/api/rooms", get(get_rooms))
        .route("/api/rooms/{room_id}", get(get_room_detail))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    if allowed_origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid allowed origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET])
}
