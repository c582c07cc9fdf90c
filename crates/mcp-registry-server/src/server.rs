//! HTTP server implementation using Axum.

use crate::auth::AuthService;
use crate::config::ServerConfig;
use crate::handlers;
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use mcp_registry::RegistryService;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::limit::ConcurrencyLimitLayer;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Application state shared across handlers.
pub struct AppState {
    pub service: RegistryService,
    pub auth: Arc<dyn AuthService>,
    /// Reported by the health endpoint.
    pub auth_enabled: bool,
}

impl AppState {
    pub fn new(service: RegistryService, auth: Arc<dyn AuthService>, auth_enabled: bool) -> Self {
        Self {
            service,
            auth,
            auth_enabled,
        }
    }
}

/// Build the `/v0` router.
pub fn build_router(state: Arc<AppState>) -> Router {
    let origins: Vec<HeaderValue> = ServerConfig::CORS_ORIGINS
        .iter()
        .map(|origin| HeaderValue::from_static(origin))
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/v0/health", get(handlers::health))
        .route("/v0/servers", get(handlers::list_servers))
        .route("/v0/servers/:id", get(handlers::get_server))
        .route("/v0/publish", post(handlers::publish))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(ConcurrencyLimitLayer::new(
                    ServerConfig::MAX_CONCURRENT_REQUESTS,
                )),
        )
        .with_state(state)
}

/// Start the HTTP server.
///
/// Returns the actual address the server is bound to (useful with port 0).
pub async fn start_server(state: Arc<AppState>, addr: SocketAddr) -> anyhow::Result<SocketAddr> {
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    info!("Server listening on {}", actual_addr);

    // Spawn the server in the background
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Server error: {}", e);
        }
    });

    Ok(actual_addr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::NoOpAuth;
    use mcp_registry::MemoryBackend;

    #[tokio::test]
    async fn test_server_starts() {
        let service = RegistryService::new(Arc::new(MemoryBackend::new()));
        let state = Arc::new(AppState::new(service, Arc::new(NoOpAuth), false));

        let addr = start_server(state, "127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        assert!(addr.port() > 0);
    }
}
